use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use merge_bot::config::AppConfig;
use merge_bot::database::Database;
use merge_bot::webhooks::{self, MergeBot};

/// First descriptor handed over by systemd socket activation.
const SD_LISTEN_FDS_START: i32 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "merge_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting merge bot");

    let config = AppConfig::load()?;
    info!("Configuration loaded");

    let database = Database::new(&config.database_url)
        .await
        .with_context(|| format!("Failed to open {}", config.database_url))?;
    database.run_migrations().await?;
    info!("Database migrations completed");

    let bot = MergeBot::from_config(&config, Arc::new(database))?;
    if bot.dry_run {
        info!("Dry run enabled, no pull request will be merged");
    }
    if bot.webhook_secret.is_none() {
        info!("No webhook secret configured, deliveries are not authenticated");
    }

    let app = webhooks::router(Arc::new(bot));

    let listener = match inherited_listener()? {
        Some(listener) => {
            info!("Using socket from systemd");
            listener
        }
        None => {
            let host: std::net::IpAddr = config
                .host
                .parse()
                .with_context(|| format!("Invalid listen address {}", config.host))?;
            let addr = SocketAddr::new(host, config.port);
            info!("Server listening on {}", addr);
            tokio::net::TcpListener::bind(addr).await?
        }
    };

    axum::serve(listener, app).await?;
    Ok(())
}

/// Socket passed in through `LISTEN_FDS`, if any.
fn inherited_listener() -> anyhow::Result<Option<tokio::net::TcpListener>> {
    let listen_fds = std::env::var("LISTEN_FDS").ok();
    let listen_pid = std::env::var("LISTEN_PID").ok();
    let Some(fd) = activation_fd(
        listen_fds.as_deref(),
        listen_pid.as_deref(),
        std::process::id(),
    )?
    else {
        return Ok(None);
    };

    #[cfg(unix)]
    {
        use std::os::unix::io::FromRawFd;
        // SAFETY: activation_fd only returns descriptors systemd passed to this process.
        let std_listener = unsafe { std::net::TcpListener::from_raw_fd(fd) };
        std_listener.set_nonblocking(true)?;
        Ok(Some(tokio::net::TcpListener::from_std(std_listener)?))
    }
    #[cfg(not(unix))]
    {
        warn!("Ignoring inherited descriptor {} on this platform", fd);
        Ok(None)
    }
}

/// Descriptor to serve from, given the socket activation environment.
fn activation_fd(
    listen_fds: Option<&str>,
    listen_pid: Option<&str>,
    own_pid: u32,
) -> anyhow::Result<Option<i32>> {
    let Some(listen_fds) = listen_fds else {
        return Ok(None);
    };
    let fds: i32 = listen_fds
        .trim()
        .parse()
        .context("LISTEN_FDS is not a number")?;

    if let Some(pid) = listen_pid {
        if pid.trim().parse::<u32>().ok() != Some(own_pid) {
            warn!(
                "LISTEN_PID {} does not match our pid {}, binding our own socket",
                pid, own_pid
            );
            return Ok(None);
        }
    }

    let fd = SD_LISTEN_FDS_START;
    if fd >= SD_LISTEN_FDS_START + fds {
        warn!("LISTEN_FDS is {}, no descriptor was passed", fds);
        return Ok(None);
    }
    if fds > 1 {
        warn!("{} descriptors passed, serving only fd {}", fds, fd);
    }
    Ok(Some(fd))
}
