//! Interactive profile creation.

use anyhow::{Context, Result, bail};
use aquactl_client::ApiClient;
use aquactl_core::profile::StoreError;
use aquactl_core::{ApiCredentials, CredentialSet, NewProfile, Secret};
use std::io::{self, Write};

use crate::cli::Cli;
use crate::context;

pub async fn run(cli: &Cli) -> Result<()> {
    let store = context::open_store()?;

    println!("aquactl setup");
    println!("Credentials are encrypted and stored under your user config directory.");
    println!();

    let name = match &cli.profile {
        Some(name) => name.clone(),
        None => prompt_with_default("Profile name", "default")?,
    };

    println!("Authentication method:");
    println!("  1) API key (SaaS)");
    println!("  2) Username and password");
    let credentials = match prompt_with_default("Choice", "1")?.as_str() {
        "1" => api_key_credentials()?,
        "2" => password_credentials()?,
        other => bail!("unrecognized choice '{}'", other),
    };

    println!("Testing connection...");
    ApiClient::connect(credentials.clone())
        .await
        .context("connection test failed")?;
    println!("Connection OK.");

    let new_profile = NewProfile { name: name.clone() };
    match store.add(new_profile.clone(), &credentials, false) {
        Ok(()) => {}
        Err(StoreError::AlreadyExists { .. }) => {
            let answer = prompt_with_default(
                &format!("Profile '{}' already exists. Overwrite? [y/N]", name),
                "n",
            )?;
            if !answer.eq_ignore_ascii_case("y") {
                bail!("aborted, profile '{}' left unchanged", name);
            }
            store.add(new_profile, &credentials, true)?;
        }
        Err(err) => return Err(err.into()),
    }

    println!("Profile '{}' saved to {}.", name, store.path().display());
    Ok(())
}

fn api_key_credentials() -> Result<CredentialSet> {
    let key = prompt("API key")?;
    let secret = rpassword::prompt_password("API secret (hidden): ")?;
    let role = optional(prompt("CSP role (optional)")?);
    let methods = optional(prompt("Allowed methods, comma-separated (optional)")?)
        .map(|raw| raw.split(',').map(|m| m.trim().to_string()).collect());
    let auth_endpoint = prompt("Auth endpoint (e.g. https://eu-1.api.cloudsploit.com)")?;
    let csp_endpoint = prompt("CSP endpoint (e.g. https://tenant.cloud.aquasec.com)")?;

    Ok(CredentialSet {
        credentials: ApiCredentials::ApiKey {
            key,
            secret: Secret::new(secret),
            role,
            methods,
        },
        csp_endpoint,
        auth_endpoint: Some(auth_endpoint),
    })
}

fn password_credentials() -> Result<CredentialSet> {
    let user = prompt("Username")?;
    let password = rpassword::prompt_password("Password (hidden): ")?;
    let csp_endpoint = prompt("CSP endpoint")?;
    let auth_endpoint = optional(prompt(
        "Auth endpoint (blank for on-prem console login)",
    )?);

    Ok(CredentialSet {
        credentials: ApiCredentials::UsernamePassword {
            user,
            password: Secret::new(password),
        },
        csp_endpoint,
        auth_endpoint,
    })
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_with_default(label: &str, default: &str) -> Result<String> {
    let answer = prompt(&format!("{} [{}]", label, default))?;
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer
    })
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
