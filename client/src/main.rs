//! `movies`: command-line front end for the movie catalogue API.
//!
//! Each invocation restores the persisted session, runs one command, and
//! leaves the session on disk for the next invocation.

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use movies_client::ClientSettings;
use movies_client::domain::ports::{AuthApi, SessionStore, TracingLoginRedirect};
use movies_client::domain::{
    AuthService, HttpPipeline, LoginCredentials, Movie, MovieFilters, MovieService, Registration,
    ReviewDraft, SessionManager, SessionTeardown, SortBy, SortOrder,
};
use movies_client::outbound::http::ReqwestTransport;
use movies_client::outbound::storage::FileSessionStore;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;
use zeroize::Zeroizing;

/// `movies` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "movies",
    about = "Browse movies and post reviews against the movie catalogue API",
    version
)]
struct Cli {
    /// API root, overriding `MOVIES_API_BASE_URL`.
    #[arg(long = "base-url", value_name = "url", global = true)]
    base_url: Option<String>,
    /// Session directory, overriding `MOVIES_STORAGE_DIR`.
    #[arg(long = "storage-dir", value_name = "path", global = true)]
    storage_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and persist the session.
    Login {
        /// Account username.
        #[arg(long)]
        username: String,
        /// Account password; read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
        /// Ask for a long-lived session.
        #[arg(long)]
        remember_me: bool,
    },
    /// Create an account and sign in with it.
    Register(RegisterArgs),
    /// End the session.
    Logout,
    /// Show the signed-in user.
    Whoami {
        /// Fetch the profile from the server instead of the persisted copy.
        #[arg(long)]
        remote: bool,
    },
    /// Exchange the session token for a fresh one.
    Refresh,
    /// Ask the server whether the session token is still valid.
    Verify,
    /// List movies.
    Movies(ListArgs),
    /// Show one movie with its reviews.
    Movie {
        /// IMDb identifier.
        imdb_id: String,
    },
    /// Post a review.
    Review {
        /// IMDb identifier of the reviewed movie.
        imdb_id: String,
        /// Review text.
        body: String,
        /// Rating from 1 to 10.
        #[arg(long)]
        rating: Option<u8>,
    },
}

#[derive(Debug, Args)]
struct RegisterArgs {
    /// Requested username.
    #[arg(long)]
    username: String,
    /// Contact email.
    #[arg(long)]
    email: String,
    /// Password; read from stdin when omitted.
    #[arg(long)]
    password: Option<String>,
    /// Given name.
    #[arg(long)]
    first_name: Option<String>,
    /// Family name.
    #[arg(long)]
    last_name: Option<String>,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Genre name.
    #[arg(long)]
    genre: Option<String>,
    /// Release year.
    #[arg(long)]
    year: Option<u16>,
    /// Minimum rating.
    #[arg(long)]
    rating: Option<f64>,
    /// Free-text search.
    #[arg(long)]
    search: Option<String>,
    /// Sort key: title, releaseDate or rating.
    #[arg(long)]
    sort_by: Option<SortBy>,
    /// Sort direction: asc or desc.
    #[arg(long)]
    sort_order: Option<SortOrder>,
}

impl From<ListArgs> for MovieFilters {
    fn from(args: ListArgs) -> Self {
        Self {
            genre: args.genre,
            year: args.year,
            rating: args.rating,
            search: args.search,
            sort_by: args.sort_by,
            sort_order: args.sort_order,
        }
    }
}

struct Client {
    session: SessionManager,
    auth: Arc<AuthService>,
    movies: MovieService,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let settings = ClientSettings::load_from_iter([OsString::from("movies")])
        .map_err(|error| eyre!("load client settings: {error}"))?;
    let client = wire(&settings, &cli)?;
    client.session.initialize().await;

    let mut out = io::stdout();
    match cli.command {
        Command::Login {
            username,
            password,
            remember_me,
        } => {
            let secret = password_or_stdin(password)?;
            let credentials = LoginCredentials::try_from_parts(&username, &secret)
                .wrap_err("invalid login input")?
                .with_remember_me(remember_me);
            let user = client.session.login(credentials).await?;
            writeln!(out, "signed in as {}", user.display_name())?;
        }
        Command::Register(args) => {
            let secret = password_or_stdin(args.password)?;
            let registration = Registration::try_new(&args.username, &args.email, &secret)?
                .with_names(args.first_name.as_deref(), args.last_name.as_deref());
            let grant = client.auth.register(&registration).await?;
            let user = client.session.adopt(grant).await?;
            writeln!(out, "registered and signed in as {}", user.display_name())?;
        }
        Command::Logout => {
            client.session.logout().await;
            writeln!(out, "signed out")?;
        }
        Command::Whoami { remote } => {
            let current = if remote {
                Some(client.session.reload_user().await?)
            } else {
                client.session.user()
            };
            match current {
                Some(user) if client.session.is_authenticated() => {
                    writeln!(out, "{} ({}) id={}", user.display_name(), user.username(), user.id())?;
                }
                _ => writeln!(out, "not signed in")?,
            }
        }
        Command::Refresh => {
            client.session.refresh_token().await?;
            writeln!(out, "session token refreshed")?;
        }
        Command::Verify => {
            let valid = client.auth.verify_token().await?;
            writeln!(out, "{}", if valid { "valid" } else { "invalid" })?;
        }
        Command::Movies(args) => {
            for movie in client.movies.list_movies(&args.into()).await? {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    movie.imdb_id,
                    movie.title,
                    movie.release_date,
                    movie.genres.join(", ")
                )?;
            }
        }
        Command::Movie { imdb_id } => {
            let movie = client.movies.get_movie(&imdb_id).await?;
            render_movie(&mut out, &movie)?;
        }
        Command::Review {
            imdb_id,
            body,
            rating,
        } => {
            let draft = ReviewDraft::try_new(&imdb_id, &body, rating)?;
            let review = client.movies.submit_review(&draft).await?;
            writeln!(
                out,
                "review {} posted",
                review.id.as_deref().unwrap_or("(unnumbered)")
            )?;
        }
    }
    Ok(())
}

fn wire(settings: &ClientSettings, cli: &Cli) -> Result<Client> {
    let base_url = match &cli.base_url {
        Some(raw) => Url::parse(raw).wrap_err_with(|| format!("invalid --base-url `{raw}`"))?,
        None => settings.api_base_url().wrap_err("invalid MOVIES_API_BASE_URL")?,
    };
    let storage_dir = cli
        .storage_dir
        .clone()
        .unwrap_or_else(|| settings.storage_dir());

    let transport = ReqwestTransport::new(&base_url, settings.timeout(), settings.user_agent())
        .wrap_err("build HTTP client")?;
    let store: Arc<dyn SessionStore> = Arc::new(
        FileSessionStore::open(&storage_dir)
            .wrap_err_with(|| format!("open session storage {}", storage_dir.display()))?,
    );
    let teardown = SessionTeardown::new(Arc::new(TracingLoginRedirect));
    let pipeline = Arc::new(
        HttpPipeline::new(Arc::new(transport), Arc::clone(&store), Arc::new(DefaultClock))
            .with_login_redirect(Arc::new(teardown.clone()), settings.login_path()),
    );
    let auth = Arc::new(AuthService::new(Arc::clone(&pipeline)));
    Ok(Client {
        session: SessionManager::with_teardown(
            Arc::clone(&auth) as Arc<dyn AuthApi>,
            store,
            &teardown,
        ),
        auth,
        movies: MovieService::new(pipeline),
    })
}

fn password_or_stdin(explicit: Option<String>) -> Result<Zeroizing<String>> {
    if let Some(password) = explicit {
        return Ok(Zeroizing::new(password));
    }
    let mut line = Zeroizing::new(String::new());
    io::stdin()
        .lock()
        .read_line(&mut line)
        .wrap_err("read password from stdin")?;
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}

fn render_movie(out: &mut impl Write, movie: &Movie) -> io::Result<()> {
    writeln!(out, "{} [{}]", movie.title, movie.imdb_id)?;
    writeln!(out, "released: {}", movie.release_date)?;
    if !movie.genres.is_empty() {
        writeln!(out, "genres: {}", movie.genres.join(", "))?;
    }
    if let Some(director) = &movie.director {
        writeln!(out, "director: {director}")?;
    }
    if let Some(rating) = movie.rating {
        writeln!(out, "rating: {rating}")?;
    }
    if !movie.trailer_link.is_empty() {
        writeln!(out, "trailer: {}", movie.trailer_link)?;
    }
    if let Some(plot) = &movie.plot {
        writeln!(out, "\n{plot}")?;
    }
    if !movie.reviews.is_empty() {
        writeln!(out, "\nreviews:")?;
        for review in &movie.reviews {
            match review.rating {
                Some(rating) => writeln!(out, "- [{rating}/10] {}", review.body)?,
                None => writeln!(out, "- {}", review.body)?,
            }
        }
    }
    Ok(())
}
