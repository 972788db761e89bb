use clap::CommandFactory;

use super::*;

fn temp_token_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("anonboard-cli-{}-{name}", std::process::id()))
}

// =============================================================================
// TokenFile
// =============================================================================

#[test]
fn token_file_missing_loads_none() {
    let tokens = TokenFile::new(temp_token_path("missing"));
    assert!(tokens.load().expect("load").is_none());
    assert!(matches!(tokens.require(), Err(CliError::MissingToken)));
}

#[test]
fn token_file_save_load_clear() {
    let tokens = TokenFile::new(temp_token_path("roundtrip"));
    tokens.save("abc.def").expect("save");
    assert_eq!(tokens.load().expect("load"), Some("abc.def".to_owned()));

    tokens.clear().expect("clear");
    assert!(tokens.load().expect("load").is_none());
    tokens.clear().expect("clearing twice is fine");
}

#[test]
fn token_file_ignores_surrounding_whitespace_and_blank_files() {
    let path = temp_token_path("whitespace");
    let tokens = TokenFile::new(&path);

    fs::write(&path, "  tok\n").expect("write");
    assert_eq!(tokens.require().expect("token"), "tok");

    fs::write(&path, "\n").expect("write");
    assert!(tokens.load().expect("load").is_none());

    tokens.clear().expect("clear");
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn render_post_shows_date_then_content() {
    let post = Post {
        id: 1,
        content: "hello".to_owned(),
        created_at: "2024-02-03 04:05:06".to_owned(),
    };
    assert_eq!(render_post(&post), "2024/2/3 4:05:06  hello");
}

#[test]
fn render_user_shows_name_and_email() {
    let user = User {
        id: 1,
        name: "taro".to_owned(),
        email: "taro@example.com".to_owned(),
    };
    assert_eq!(render_user(&user), "taro (taro@example.com)");
}

#[test]
fn server_error_display_keeps_message() {
    let err = CliError::Server {
        status: 400,
        message: "メールアドレスまたはパスワードが間違っています".to_owned(),
    };
    assert_eq!(err.to_string(), "メールアドレスまたはパスワードが間違っています (HTTP 400)");
}

// =============================================================================
// Argument parsing
// =============================================================================

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn parses_post_with_positional_content() {
    let cli = Cli::try_parse_from(["anonboard-cli", "--token-file", "/tmp/t", "post", "hi there"]).expect("parse");
    assert_eq!(cli.token_file, PathBuf::from("/tmp/t"));
    assert!(matches!(cli.command, Command::Post { ref content } if content == "hi there"));
}

#[test]
fn parses_register_fields() {
    let cli = Cli::try_parse_from([
        "anonboard-cli",
        "register",
        "--name",
        "n",
        "--email",
        "e@x.y",
        "--password",
        "pw",
    ])
    .expect("parse");
    match cli.command {
        Command::Register { name, email, password } => {
            assert_eq!((name.as_str(), email.as_str(), password.as_str()), ("n", "e@x.y", "pw"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}
