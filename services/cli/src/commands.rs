use crate::infra::{console_progress, ConsoleNotifier};
use clap::Args;
use estate_client::config::ClientConfig;
use estate_client::controller::{Confirmation, Dispatch, ScreenController};
use estate_client::error::AppError;
use estate_client::navigation::TracingNavigator;
use estate_client::session::FileSessionStore;
use estate_client::telemetry;
use estate_client::upload::{DocumentSlot, FileDescriptor, VerificationRequest};
use estate_client::{ApiClient, IdentityProvider, SignUpRequest};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

type Controller = ScreenController<FileSessionStore, ConsoleNotifier, TracingNavigator>;

#[derive(Args, Debug)]
pub(crate) struct SignInArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) password: String,
}

#[derive(Args, Debug)]
pub(crate) struct ExchangeArgs {
    /// google or facebook
    #[arg(long)]
    pub(crate) provider: IdentityProvider,
    /// Access token issued by the provider
    #[arg(long)]
    pub(crate) token: String,
}

#[derive(Args, Debug)]
pub(crate) struct SignUpArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) phone: String,
    #[arg(long)]
    pub(crate) password: String,
}

#[derive(Args, Debug)]
pub(crate) struct DeleteArgs {
    /// Identifier of the listing to remove
    pub(crate) listing_id: String,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub(crate) yes: bool,
}

#[derive(Args, Debug)]
pub(crate) struct VerifyArgs {
    #[arg(long)]
    pub(crate) property_id: String,
    #[arg(long)]
    pub(crate) full_name: String,
    #[arg(long)]
    pub(crate) phone: String,
    /// Title deed or other proof of ownership
    #[arg(long)]
    pub(crate) deed: Option<PathBuf>,
    /// Government identity document
    #[arg(long = "id")]
    pub(crate) identity: Option<PathBuf>,
    /// Live photo of the owner
    #[arg(long)]
    pub(crate) selfie: Option<PathBuf>,
}

pub(crate) async fn sign_in(args: SignInArgs) -> Result<(), AppError> {
    let controller = controller()?;
    let dispatch = controller.sign_in(&args.email, &args.password).await;
    print_user(finish(dispatch)?)
}

pub(crate) async fn sign_in_with(args: ExchangeArgs) -> Result<(), AppError> {
    let controller = controller()?;
    let dispatch = controller.sign_in_with(args.provider, &args.token).await;
    print_user(finish(dispatch)?)
}

pub(crate) async fn sign_up(args: SignUpArgs) -> Result<(), AppError> {
    let request = SignUpRequest {
        name: args.name,
        email: args.email,
        phone: args.phone,
        password: args.password,
    };
    let controller = controller()?;
    let dispatch = controller.sign_up(&request).await;
    print_user(finish(dispatch)?)
}

pub(crate) fn sign_out() -> Result<(), AppError> {
    let controller = controller()?;
    controller.client().sign_out()?;
    println!("Signed out.");
    Ok(())
}

pub(crate) fn whoami() -> Result<(), AppError> {
    let controller = controller()?;
    match controller.client().current_session()? {
        Some(record) => {
            println!("Signed in since {}", record.saved_at.to_rfc3339());
            print_user(Some(record.user))
        }
        None => {
            println!("Not signed in.");
            Ok(())
        }
    }
}

pub(crate) async fn delete_listing(args: DeleteArgs) -> Result<(), AppError> {
    let confirmation = if args.yes {
        Confirmation::Confirmed
    } else {
        confirm(&format!("Delete listing {}?", args.listing_id))?
    };
    let controller = controller()?;
    let dispatch = controller
        .delete_listing(&args.listing_id, confirmation)
        .await;
    if matches!(dispatch, Dispatch::Declined) {
        println!("Nothing deleted.");
    }
    finish(dispatch)?;
    Ok(())
}

pub(crate) async fn verify(args: VerifyArgs) -> Result<(), AppError> {
    let controller = controller()?.with_progress(console_progress());
    for (slot, path) in [
        (DocumentSlot::Deed, args.deed),
        (DocumentSlot::Identity, args.identity),
        (DocumentSlot::Selfie, args.selfie),
    ] {
        if let Some(path) = path {
            controller.pick_document(slot, FileDescriptor::from_path(path));
        }
    }
    let request = VerificationRequest {
        property_id: args.property_id,
        full_name: args.full_name,
        phone_number: args.phone,
    };
    let dispatch = controller.submit_verification(&request).await;
    finish(dispatch)?;
    Ok(())
}

fn controller() -> Result<Controller, AppError> {
    let config = ClientConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let store = Arc::new(FileSessionStore::new(config.session.path.clone()));
    let client = ApiClient::new(config.api, store)?;
    Ok(ScreenController::new(
        Arc::new(client),
        Arc::new(ConsoleNotifier),
        Arc::new(TracingNavigator),
    ))
}

/// Turn a dispatch into the command's result; a failed call exits non-zero.
fn finish<T>(dispatch: Dispatch<T>) -> Result<Option<T>, AppError> {
    match dispatch {
        Dispatch::Completed(Ok(value)) => Ok(Some(value)),
        Dispatch::Completed(Err(failure)) => Err(failure.into()),
        Dispatch::Busy | Dispatch::Declined => Ok(None),
    }
}

fn print_user(user: Option<Value>) -> Result<(), AppError> {
    if let Some(user) = user {
        let rendered = serde_json::to_string_pretty(&user).map_err(io::Error::other)?;
        println!("{rendered}");
    }
    Ok(())
}

fn confirm(question: &str) -> Result<Confirmation, AppError> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(parse_confirmation(&answer))
}

fn parse_confirmation(answer: &str) -> Confirmation {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Confirmation::Confirmed,
        _ => Confirmation::Declined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_client::{ActionFailure, FailureKind};

    #[test]
    fn only_explicit_yes_confirms() {
        assert_eq!(parse_confirmation("y\n"), Confirmation::Confirmed);
        assert_eq!(parse_confirmation(" YES "), Confirmation::Confirmed);
        assert_eq!(parse_confirmation("\n"), Confirmation::Declined);
        assert_eq!(parse_confirmation("no"), Confirmation::Declined);
    }

    #[test]
    fn failed_dispatch_becomes_an_error() {
        let dispatch: Dispatch<()> = Dispatch::Completed(Err(ActionFailure::new(
            FailureKind::Server,
            "Unable to delete the listing",
        )));
        let err = finish(dispatch).expect_err("failure propagates");
        assert_eq!(
            err.to_string(),
            "server failure: Unable to delete the listing"
        );
        assert!(matches!(finish::<()>(Dispatch::Declined), Ok(None)));
    }
}
