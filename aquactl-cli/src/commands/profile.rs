//! Profile management subcommands.

use anyhow::Result;
use comfy_table::Table;

use crate::cli::{Cli, ProfileCommands};
use crate::context;
use crate::output::{json::print_json, table::print_table};

pub fn run(cli: &Cli, command: &ProfileCommands) -> Result<()> {
    let store = context::open_store()?;

    match command {
        ProfileCommands::List => {
            let profiles = store.list()?;
            if !cli.verbose {
                return print_json(&profiles);
            }

            let mut table = Table::new();
            table.set_header(vec!["name", "method", "csp endpoint", "default", "created"]);
            for profile in &profiles {
                table.add_row(vec![
                    profile.name.clone(),
                    profile.auth_method.to_string(),
                    profile.csp_endpoint.clone(),
                    if profile.is_default { "*".to_string() } else { String::new() },
                    profile.created_at.format("%Y-%m-%d").to_string(),
                ]);
            }
            print_table(table)
        }

        ProfileCommands::Info { name } => {
            // Metadata only; the encrypted payload is never decoded.
            let info = store.info(name.as_deref())?;
            if !cli.verbose {
                return print_json(&info);
            }

            println!("Profile:       {}", info.name);
            println!("Method:        {}", info.auth_method);
            println!("CSP endpoint:  {}", info.csp_endpoint);
            println!(
                "Auth endpoint: {}",
                info.auth_endpoint.as_deref().unwrap_or("(console login)")
            );
            println!("Created:       {}", info.created_at.to_rfc3339());
            println!("Default:       {}", if info.is_default { "yes" } else { "no" });
            Ok(())
        }

        ProfileCommands::Delete { name } => {
            store.remove(name)?;
            if cli.verbose {
                println!("Profile '{}' deleted.", name);
            }
            Ok(())
        }

        ProfileCommands::SetDefault { name } => {
            store.set_default(name)?;
            if cli.verbose {
                println!("Profile '{}' is now the default.", name);
            }
            Ok(())
        }
    }
}
