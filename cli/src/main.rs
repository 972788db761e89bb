use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use wire::{AuthResponse, LoginRequest, NewPost, Post, RegisterRequest, User};

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("not logged in; run `login` or `register` first")]
    MissingToken,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} (HTTP {status})")]
    Server { status: u16, message: String },
    #[error("token file {}: {source}", .path.display())]
    TokenFile { path: PathBuf, source: io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "anonboard-cli", about = "Anonymous bulletin board from the terminal")]
struct Cli {
    #[arg(long, env = "ANONBOARD_API_BASE_URL", default_value = "http://localhost:8080")]
    base_url: String,

    /// Where the bearer token is kept between runs.
    #[arg(long, env = "ANONBOARD_TOKEN_FILE", default_value = ".anonboard-token")]
    token_file: PathBuf,

    /// Print raw JSON instead of formatted lines.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List posts, newest first.
    Posts,
    /// Show the user the stored token belongs to.
    Me,
    /// Log in and store the returned token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ANONBOARD_PASSWORD")]
        password: String,
    },
    /// Create an account and store the returned token.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "ANONBOARD_PASSWORD")]
        password: String,
    },
    /// Publish a post as the logged-in user.
    Post { content: String },
}

/// The bearer token persisted on disk, one file, one token.
#[derive(Debug, Clone)]
struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Option<String>, CliError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_owned()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.error(e)),
        }
    }

    fn require(&self) -> Result<String, CliError> {
        self.load()?.ok_or(CliError::MissingToken)
    }

    fn save(&self, token: &str) -> Result<(), CliError> {
        fs::write(&self.path, token).map_err(|e| self.error(e))
    }

    fn clear(&self) -> Result<(), CliError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error(e)),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, source: io::Error) -> CliError {
        CliError::TokenFile {
            path: self.path.clone(),
            source,
        }
    }
}

struct Api {
    client: reqwest::Client,
    base_url: String,
}

impl Api {
    fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T, CliError> {
        let mut request = self.client.get(wire::endpoint(&self.base_url, path));
        if let Some(token) = token {
            request = request.header(reqwest::header::AUTHORIZATION, wire::bearer(token));
        }
        decode(request.send().await?).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, CliError> {
        let mut request = self.client.post(wire::endpoint(&self.base_url, path)).json(body);
        if let Some(token) = token {
            request = request.header(reqwest::header::AUTHORIZATION, wire::bearer(token));
        }
        decode(request.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CliError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CliError::Server {
            status: status.as_u16(),
            message: wire::error_message(status.as_u16(), &body),
        });
    }
    Ok(response.json::<T>().await?)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let api = Api::new(cli.base_url);
    let tokens = TokenFile::new(cli.token_file);

    match cli.command {
        Command::Posts => {
            let posts: Vec<Post> = api.get(wire::POSTS_PATH, None).await?;
            if cli.json {
                print_json(&posts)?;
            } else {
                for post in &posts {
                    println!("{}", render_post(post));
                }
            }
        }
        Command::Me => {
            let token = tokens.require()?;
            match api.get::<User>(wire::ME_PATH, Some(&token)).await {
                Ok(user) => print_user(&user, cli.json)?,
                Err(e @ CliError::Server { .. }) => {
                    tokens.clear()?;
                    eprintln!("stored token rejected; removed {}", tokens.path().display());
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }
        Command::Login { email, password } => {
            let body = LoginRequest { email, password };
            let auth: AuthResponse = api.post(wire::LOGIN_PATH, None, &body).await?;
            tokens.save(&auth.token)?;
            print_user(&auth.user, cli.json)?;
        }
        Command::Register { name, email, password } => {
            let body = RegisterRequest { name, email, password };
            let auth: AuthResponse = api.post(wire::REGISTER_PATH, None, &body).await?;
            tokens.save(&auth.token)?;
            print_user(&auth.user, cli.json)?;
        }
        Command::Post { content } => {
            let token = tokens.require()?;
            let post: Post = api.post(wire::POSTS_PATH, Some(&token), &NewPost { content }).await?;
            if cli.json {
                print_json(&post)?;
            } else {
                println!("{}", render_post(&post));
            }
        }
    }
    Ok(())
}

fn render_post(post: &Post) -> String {
    format!("{}  {}", wire::display_timestamp(&post.created_at), post.content)
}

fn render_user(user: &User) -> String {
    format!("{} ({})", user.name, user.email)
}

fn print_user(user: &User, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(user);
    }
    println!("{}", render_user(user));
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
