use crate::commands::{self, DeleteArgs, ExchangeArgs, SignInArgs, SignUpArgs, VerifyArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use estate_client::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "estate",
    about = "Drive the estate listing API from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the in-process stub backend (default command)
    Serve(ServeArgs),
    /// Sign in with email and password
    SignIn(SignInArgs),
    /// Sign in with a Google or Facebook access token
    SignInWith(ExchangeArgs),
    /// Create an account
    SignUp(SignUpArgs),
    /// Forget the saved session
    SignOut,
    /// Print the saved session record
    Whoami,
    /// Delete one of your listings
    DeleteListing(DeleteArgs),
    /// Upload property verification documents
    Verify(VerifyArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the stub backend
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the stub backend
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::SignIn(args) => commands::sign_in(args).await,
        Command::SignInWith(args) => commands::sign_in_with(args).await,
        Command::SignUp(args) => commands::sign_up(args).await,
        Command::SignOut => commands::sign_out(),
        Command::Whoami => commands::whoami(),
        Command::DeleteListing(args) => commands::delete_listing(args).await,
        Command::Verify(args) => commands::verify(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_client::IdentityProvider;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["estate"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_identity_exchange() {
        let cli = Cli::try_parse_from([
            "estate",
            "sign-in-with",
            "--provider",
            "Facebook",
            "--token",
            "abc",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::SignInWith(args)) => {
                assert_eq!(args.provider, IdentityProvider::Facebook);
                assert_eq!(args.token, "abc");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn delete_requires_an_id() {
        assert!(Cli::try_parse_from(["estate", "delete-listing"]).is_err());
        let cli = Cli::try_parse_from(["estate", "delete-listing", "42", "--yes"]).expect("parses");
        match cli.command {
            Some(Command::DeleteListing(args)) => {
                assert_eq!(args.listing_id, "42");
                assert!(args.yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_provider() {
        let result = Cli::try_parse_from([
            "estate",
            "sign-in-with",
            "--provider",
            "apple",
            "--token",
            "abc",
        ]);
        assert!(result.is_err());
    }
}
