//! Subcommands

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::{Value, json};
use storefront_api::{ApiClient, AuthApi, LoginOutcome, RequestBody};
use tracing::info;

use crate::args;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with email and password
    Login { email: String, password: String },

    /// Complete a two-factor login with the emailed code
    VerifyOtp { email: String, otp: String },

    /// Forget the stored session
    Logout,

    /// Show the stored user and session state
    Whoami,

    /// Call an API endpoint with the stored session
    Request {
        /// HTTP method (GET, POST, PUT, DELETE, ...)
        #[arg(value_parser = args::parse_method)]
        method: reqwest::Method,

        /// Path relative to the API base URL, e.g. /products
        path: String,

        /// JSON request body
        #[arg(long, value_parser = args::parse_json, conflicts_with_all = ["form", "file"])]
        data: Option<Value>,

        /// Query parameter (repeatable)
        #[arg(long = "query", value_name = "KEY=VALUE", value_parser = args::parse_pair)]
        query: Vec<(String, String)>,

        /// Multipart text field (repeatable)
        #[arg(long = "form", value_name = "KEY=VALUE", value_parser = args::parse_pair)]
        form: Vec<(String, String)>,

        /// Multipart file field (repeatable)
        #[arg(long = "file", value_name = "FIELD=PATH", value_parser = args::parse_pair)]
        file: Vec<(String, String)>,
    },
}

impl Commands {
    /// Run the command and return the JSON to print.
    pub async fn execute(self, client: &ApiClient, auth: &AuthApi) -> Result<Value> {
        match self {
            Commands::Login { email, password } => {
                match auth.login(&email, &password).await.context("login failed")? {
                    LoginOutcome::Authenticated(session) => Ok(json!({
                        "status": "authenticated",
                        "message": session.message,
                        "user": session.user,
                    })),
                    LoginOutcome::TwoFactorRequired { email, message } => Ok(json!({
                        "status": "two_factor_required",
                        "email": email,
                        "message": message,
                    })),
                }
            }
            Commands::VerifyOtp { email, otp } => auth
                .verify_otp(&email, &otp)
                .await
                .context("OTP verification failed"),
            Commands::Logout => {
                auth.logout().await.context("logout failed")?;
                Ok(json!({"status": "logged_out"}))
            }
            Commands::Whoami => Ok(json!({
                "authenticated": auth.is_authenticated().await?,
                "admin": auth.is_admin().await?,
                "user": auth.current_user().await?,
            })),
            Commands::Request {
                method,
                path,
                data,
                query,
                form,
                file,
            } => {
                let multipart = !form.is_empty() || !file.is_empty();
                let body = if multipart {
                    Some(RequestBody::Form(args::form_parts(&form, &file)?))
                } else {
                    data.map(RequestBody::Json)
                };
                let query: Vec<(&str, &str)> =
                    query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

                info!(%method, %path, multipart, "calling API");
                let response = client
                    .request(method.clone(), &path, body, &query, multipart)
                    .await
                    .with_context(|| format!("{method} {path} failed"))?;

                match response.data() {
                    Ok(value) => Ok(value),
                    Err(_) => Ok(Value::String(response.text())),
                }
            }
        }
    }
}
