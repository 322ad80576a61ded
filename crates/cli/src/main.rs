use anyhow::{bail, Context, Result};
use clap::Parser;
use hearth_client::{ApiClient, ApiConfig, Session};
use hearth_core::{MemberDirectory, MemberId};
use hearth_import::{parse_upload, CategoryRuleEngine, ImportSession};
use tracing_subscriber::EnvFilter;

mod args;
mod report;
mod settings;

use args::Args;
use settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = Settings::load(&args.config)?;
    if let Ok(token) = std::env::var("HEARTH_TOKEN") {
        settings.api.token = Some(token);
    }

    let client = ApiClient::new(&settings.api)?;
    let mut session: Option<Session> = None;

    // ── Rows ──────────────────────────────────────────────────────────────────
    let mut import = if args.server_parse {
        let data = std::fs::read(&args.file)
            .with_context(|| format!("Failed to read {}", args.file.display()))?;
        let file_name = args
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        let s = ensure_session(&mut session, &client, &settings.api, args.register.as_deref())
            .await?;
        let response = client.upload_csv(s, &file_name, data).await?;
        ImportSession::from_upload_response(response)
    } else {
        let file = std::fs::File::open(&args.file)
            .with_context(|| format!("Failed to open {}", args.file.display()))?;
        let upload = parse_upload(file, &settings.csv)?;
        tracing::info!("Parsed {} rows from {}", upload.total_rows(), args.file.display());
        ImportSession::from_csv(upload)
    };

    // ── Mapping ───────────────────────────────────────────────────────────────
    import = import.with_mapping(settings.mapping.clone());
    for (field, column) in &args.mappings {
        import.set_mapping(*field, column.clone());
    }

    // ── Type matching ─────────────────────────────────────────────────────────
    if let Some(path) = &settings.rules {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules {}", path.display()))?;
        let engine = CategoryRuleEngine::from_toml(&content)?;
        let matched = import.apply_matcher(&engine);
        tracing::info!("{} rules matched {} rows", engine.len(), matched);
    }

    // ── Members ───────────────────────────────────────────────────────────────
    if !args.members.is_empty() || args.member_all.is_some() {
        let wanted = args
            .members
            .iter()
            .map(|(_, who)| who.as_str())
            .chain(args.member_all.as_deref());
        let directory = if wanted.clone().all(|who| MemberId::parse(who).is_some()) {
            MemberDirectory::default()
        } else {
            let s = ensure_session(&mut session, &client, &settings.api, args.register.as_deref())
            .await?;
            let directory = MemberDirectory::new(client.members(s).await?);
            if directory.is_empty() {
                tracing::warn!("The household has no members yet");
            }
            directory
        };

        for who in wanted {
            let id = report::resolve_member(who, &directory);
            if MemberId::parse(&id).is_none() {
                tracing::warn!(
                    "'{who}' is not a known member; it will be left off. Known: {}",
                    report::member_options(&directory)
                );
            }
        }

        for (row, who) in &args.members {
            import.assign_member(row - 1, report::resolve_member(who, &directory))?;
        }
        if let Some(who) = &args.member_all {
            let id = report::resolve_member(who, &directory);
            let tagged: Vec<usize> = args.members.iter().map(|(row, _)| row - 1).collect();
            for index in (0..import.len()).filter(|i| !tagged.contains(i)) {
                import.assign_member(index, id.clone())?;
            }
        }
    }

    // ── Review ────────────────────────────────────────────────────────────────
    let limit = args.preview.unwrap_or(settings.preview_rows);
    println!("{}", report::preview_caption(&import, limit));
    println!("{}", report::preview_table(&import, limit));
    for note in report::review_notes(&import) {
        println!("! {note}");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&import.assemble())?);
    }

    // ── Commit ────────────────────────────────────────────────────────────────
    if args.submit {
        if !import.is_complete() {
            bail!("Column mapping incomplete; nothing was submitted");
        }
        let s = ensure_session(&mut session, &client, &settings.api, args.register.as_deref())
            .await?;
        let message = import.submit(&client.sink(s)).await?;
        println!("{message}");
    }

    Ok(())
}

/// Uses the configured token, or registers / logs in with `HEARTH_EMAIL` /
/// `HEARTH_PASSWORD`. The session is created at most once per run.
async fn ensure_session<'a>(
    session: &'a mut Option<Session>,
    client: &ApiClient,
    api: &ApiConfig,
    register: Option<&str>,
) -> Result<&'a Session> {
    if session.is_none() {
        let s = match (&api.token, register) {
            (Some(token), _) => {
                let s = Session::new(token.clone());
                match client.current_user(&s).await {
                    Ok(user) => tracing::debug!("Token accepted for {}", user.username),
                    Err(e) if e.is_unauthorized() => {
                        bail!("The configured API token was rejected; log in again")
                    }
                    Err(e) => return Err(e.into()),
                }
                s
            }
            (None, username) => {
                let email = std::env::var("HEARTH_EMAIL")
                    .context("No API token configured and HEARTH_EMAIL is not set")?;
                let password = std::env::var("HEARTH_PASSWORD")
                    .context("HEARTH_PASSWORD is not set")?;
                match username {
                    Some(username) => client.register(username, &email, &password).await?,
                    None => client.login(&email, &password).await?,
                }
            }
        };
        *session = Some(s);
    }
    session
        .as_ref()
        .context("session was just created")
}
