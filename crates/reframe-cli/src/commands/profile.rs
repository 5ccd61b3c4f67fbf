//! Profile command implementation.

use crate::cli::{ProfileAction, ProfileArgs};
use crate::config::{Config, Profile};
use crate::error::{CliError, Result};
use crate::output::Formatter;

/// Execute the profile command.
pub fn execute_profile(args: ProfileArgs, config: &mut Config, formatter: &Formatter) -> Result<()> {
    match args.action {
        ProfileAction::List => list_profiles(config, formatter),
        ProfileAction::Show => show_active_profile(config, formatter),
        ProfileAction::Add {
            name,
            endpoint,
            model,
            timeout_secs,
        } => add_profile(
            config,
            name,
            Profile {
                endpoint,
                model,
                timeout_secs,
            },
            formatter,
        ),
        ProfileAction::Use { name } => use_profile(config, name, formatter),
        ProfileAction::Remove { name } => remove_profile(config, name, formatter),
    }
}

/// List all profiles.
fn list_profiles(config: &Config, formatter: &Formatter) -> Result<()> {
    if config.profiles.is_empty() {
        println!("{}", formatter.info("No profiles configured"));
        return Ok(());
    }

    println!("Available profiles:");
    for (name, profile) in &config.profiles {
        if name == &config.active_profile {
            println!("* {}", formatter.success(name));
        } else {
            println!("  {}", name);
        }
        println!("    Endpoint: {}", profile.endpoint);
        println!("    Model: {}", profile.model);
        println!("    Timeout: {}s", profile.timeout_secs);
    }

    Ok(())
}

/// Show the active profile.
fn show_active_profile(config: &Config, formatter: &Formatter) -> Result<()> {
    let profile = config.get_active_profile()?;

    println!("Active profile: {}", formatter.success(&config.active_profile));
    println!("  Endpoint: {}", profile.endpoint);
    println!("  Model: {}", profile.model);
    println!("  Timeout: {}s", profile.timeout_secs);

    Ok(())
}

/// Create or update a profile.
fn add_profile(config: &mut Config, name: String, profile: Profile, formatter: &Formatter) -> Result<()> {
    if profile.timeout_secs == 0 {
        return Err(CliError::InvalidInput("timeout must be greater than 0".to_string()));
    }

    let action = if config.profiles.contains_key(&name) {
        "Updated"
    } else {
        "Created"
    };

    config.set_profile(name.clone(), profile);
    config.save()?;

    println!("{}", formatter.success(&format!("{} profile '{}'", action, name)));
    Ok(())
}

/// Switch to a different profile.
fn use_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<()> {
    config.switch_profile(name.clone())?;
    config.save()?;
    println!("{}", formatter.success(&format!("Switched to profile '{}'", name)));
    Ok(())
}

/// Delete a profile.
fn remove_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<()> {
    if name == config.active_profile {
        return Err(CliError::NotPermitted(
            "Cannot delete the active profile".to_string(),
        ));
    }

    if config.profiles.remove(&name).is_some() {
        config.save()?;
        println!("{}", formatter.success(&format!("Deleted profile '{}'", name)));
    } else {
        println!(
            "{}",
            formatter.warning(&format!("Profile '{}' does not exist", name))
        );
    }

    Ok(())
}
