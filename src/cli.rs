// ABOUTME: Command line arguments for connecting to a node
// ABOUTME: Flattenable clap args with logging setup and session config building

use clap::Args;
use std::time::Duration;

use crate::session::{Credentials, SessionConfig};

/// Node connection arguments
///
/// Use with `#[command(flatten)]` in a binary's Args struct:
/// ```ignore
/// #[derive(Parser)]
/// struct MyArgs {
///     #[command(flatten)]
///     node: NodeArgs,
/// }
/// ```
#[derive(Args, Debug, Clone)]
pub struct NodeArgs {
    /// Node host
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Node port
    #[arg(short, long, default_value = "2333")]
    pub port: u16,

    /// Connect with TLS
    #[arg(long)]
    pub secure: bool,

    /// Node password
    #[arg(long, env = "NOVALINK_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Bot user id
    #[arg(long, env = "NOVALINK_BOT_ID")]
    pub bot_id: u64,

    /// Resume key; with --resume and no value a random key is generated
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    pub resume: Option<String>,

    /// Heartbeat interval in seconds, 0 to disable
    #[arg(long, default_value = "30")]
    pub heartbeat: u64,

    /// Reconnect delay in seconds
    #[arg(long, default_value = "5")]
    pub reconnect_delay: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl NodeArgs {
    /// Initialize tracing based on verbosity flag
    pub fn init_tracing(&self) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let filter = if self.verbose {
            "novalink=debug,novalink_monitor=debug"
        } else {
            "novalink=info,novalink_monitor=info"
        };

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| filter.into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Log startup information
    pub fn log_startup_info(&self) {
        let config = self.build_config();
        tracing::info!("novalink v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!("Node: {}", config.websocket_url());
        tracing::info!("Bot id: {}", self.bot_id);
    }

    /// Build a SessionConfig from these args
    pub fn build_config(&self) -> SessionConfig {
        SessionConfig::new(&self.host, self.port)
            .secure(self.secure)
            .heartbeat(Duration::from_secs(self.heartbeat))
            .reconnect_delay(Duration::from_secs(self.reconnect_delay))
    }

    /// Build the credentials to start a session with
    pub fn credentials(&self) -> Credentials {
        let credentials = Credentials::new(&self.password, self.bot_id);
        match self.resume.as_deref() {
            None => credentials,
            Some("") => credentials.resume_key(uuid::Uuid::new_v4().to_string()),
            Some(key) => credentials.resume_key(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestArgs {
        #[command(flatten)]
        node: NodeArgs,
    }

    fn parse(args: &[&str]) -> NodeArgs {
        let mut argv = vec!["test", "--password", "pw", "--bot-id", "42"];
        argv.extend_from_slice(args);
        TestArgs::try_parse_from(argv).unwrap().node
    }

    #[test]
    fn test_default_args() {
        let args = parse(&[]);
        assert_eq!(args.host, "localhost");
        assert_eq!(args.port, 2333);
        assert!(!args.secure);
        assert!(args.credentials().resume_key.is_none());
    }

    #[test]
    fn test_build_config() {
        let args = parse(&["--host", "node.local", "-p", "8080", "--secure", "--heartbeat", "10"]);
        let config = args.build_config();
        assert_eq!(config.websocket_url(), "wss://node.local:8080/v3/websocket");
        assert_eq!(config.heartbeat, Duration::from_secs(10));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_resume_key() {
        let generated = parse(&["--resume"]).credentials();
        let key = generated.resume_key.unwrap();
        assert!(uuid::Uuid::parse_str(&key).is_ok());

        let given = parse(&["--resume", "my-key"]).credentials();
        assert_eq!(given.resume_key.as_deref(), Some("my-key"));
    }
}
