//! Sign-in, registration and account commands.

use clap::Args;
use secrecy::SecretString;

use sdcart_client::AppContext;
use sdcart_client::auth::Registration;

use super::{CliError, read_secret};

/// Fields for `sdcart register`.
#[derive(Args)]
pub struct RegisterArgs {
    #[arg(short, long)]
    email: String,

    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    dob: String,

    #[arg(long)]
    mobile: String,

    #[arg(long)]
    alt_mobile: Option<String>,

    /// Password (prompted twice when absent)
    #[arg(long, env = "SDCART_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

/// Sign in, then show the loaded cart size.
///
/// # Errors
///
/// Returns an error if the password cannot be read or sign-in fails.
pub async fn login(
    context: &AppContext,
    email: &str,
    password: Option<String>,
) -> Result<(), CliError> {
    let password = match password {
        Some(password) => SecretString::from(password),
        None => read_secret("Password: ", "password")?,
    };

    let claims = context.login(email, &password).await?;
    println!("Signed in as {}", claims.sub);
    println!("Cart: {} item(s)", context.cart().count());
    Ok(())
}

/// Create an account.
///
/// # Errors
///
/// Returns an error if the form is invalid or the backend refuses it.
pub async fn register(context: &AppContext, args: RegisterArgs) -> Result<(), CliError> {
    let (password, confirm_password) = match args.password {
        Some(password) => (
            SecretString::from(password.clone()),
            SecretString::from(password),
        ),
        None => (
            read_secret("Password: ", "password")?,
            read_secret("Confirm password: ", "password confirmation")?,
        ),
    };

    let registration = Registration {
        email: args.email,
        password,
        confirm_password,
        first_name: args.first_name,
        last_name: args.last_name,
        dob: args.dob,
        mobile: args.mobile,
        alt_mobile: args.alt_mobile,
    };

    context.auth().register(&registration).await?;
    println!("Registered successfully. Run `sdcart login` to sign in.");
    Ok(())
}

/// Forget the stored session.
pub fn logout(context: &AppContext) {
    context.logout();
    println!("Signed out");
}

/// Show session claims and account details.
///
/// # Errors
///
/// Returns an error if there is no valid session or the lookup fails.
pub async fn whoami(context: &AppContext) -> Result<(), CliError> {
    let claims = context.auth().current_user()?;
    println!("Subject:  {}", claims.sub);
    if let Some(role) = &claims.role {
        println!("Role:     {role}");
    }
    if let Some(exp) = claims.exp
        && let Some(expires) = format_expiry(exp)
    {
        println!("Expires:  {expires}");
    }

    let profile = context.auth().account_info().await?;
    if let Some(name) = profile.full_name() {
        println!("Name:     {name}");
    }
    if let Some(email) = &profile.email {
        println!("Email:    {email}");
    }
    if let Some(mobile) = &profile.mobile {
        println!("Mobile:   {mobile}");
    }
    Ok(())
}

fn format_expiry(epoch_seconds: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(epoch_seconds, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}
