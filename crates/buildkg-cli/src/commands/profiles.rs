//! Profiles command implementation.

use crate::cli::{ProfilesAction, ProfilesArgs};
use crate::error::Result;
use crate::output::Formatter;
use buildkg_profile::ProfileResolver;

/// Execute the profiles command.
pub fn execute_profiles(
    args: ProfilesArgs,
    resolver: &mut ProfileResolver,
    formatter: &Formatter,
) -> Result<()> {
    match args.action {
        ProfilesAction::List => list_profiles(resolver, formatter),
        ProfilesAction::Show { name } => show_profile(resolver, name, formatter),
    }
}

/// List the profiles in the profile directory.
fn list_profiles(resolver: &ProfileResolver, formatter: &Formatter) -> Result<()> {
    let names = resolver.store().list_profiles();
    println!("Profiles in {}:", resolver.store().dir().display());
    println!("{}", formatter.profile_list(&names, resolver.selected()));
    Ok(())
}

/// Show a resolved profile, inheritance applied.
fn show_profile(
    resolver: &mut ProfileResolver,
    name: Option<String>,
    formatter: &Formatter,
) -> Result<()> {
    let profile = match name {
        Some(name) => resolver.store().load_profile(&name)?,
        None => resolver.get()?.as_ref().clone(),
    };
    println!("{}", formatter.profile_details(&profile));
    Ok(())
}
