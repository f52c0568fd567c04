//! Extract-id command implementation.

use crate::cli::ExtractIdArgs;
use crate::error::Result;
use crate::output::Formatter;
use buildkg_extractor::{ProvisionIdExtractor, ProvisionIdValidator};
use buildkg_profile::ProfileResolver;

/// Execute the extract-id command with the active profile's patterns.
pub fn execute_extract_id(
    args: ExtractIdArgs,
    resolver: &mut ProfileResolver,
    formatter: &Formatter,
) -> Result<()> {
    let profile = resolver.get()?;
    let extractor = ProvisionIdExtractor::from_profile(&profile)?;
    let validator = ProvisionIdValidator::from_profile(&profile)?;

    let result = extractor.extract(&args.text, args.locator.as_deref(), &args.authority);
    let validation = validator.validate(&result.provision_id, &args.authority);

    println!("{}", formatter.extraction(&result, &validation));
    Ok(())
}
