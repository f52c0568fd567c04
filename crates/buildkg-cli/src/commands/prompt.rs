//! Prompt command implementation.

use crate::cli::PromptArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use buildkg_extractor::render_prompt_template;
use buildkg_profile::ProfileResolver;

use super::prompt_builder;

/// Print the system message and user prompt for one excerpt.
pub fn execute_prompt(
    args: PromptArgs,
    resolver: &mut ProfileResolver,
    formatter: &Formatter,
) -> Result<()> {
    let profile = resolver.get()?;

    if args.template {
        let template = profile.parsing.prompt_template.as_deref().ok_or_else(|| {
            CliError::InvalidInput(format!(
                "Profile '{}' has no prompt_template",
                profile.name
            ))
        })?;
        let rendered = render_prompt_template(
            template,
            &profile.parsing,
            &args.excerpt,
            &args.authority,
            &args.jurisdiction,
        )?;
        println!("{}", formatter.header("Prompt template"));
        println!("{}", rendered);
        return Ok(());
    }

    let prompts = prompt_builder(&profile, &args.ontology)?;
    let (system_message, user_prompt) =
        prompts.build(&args.excerpt, &args.authority, &args.jurisdiction);

    println!("{}", formatter.header("System message"));
    println!("{}", system_message);
    println!("{}", formatter.header("User prompt"));
    println!("{}", user_prompt);
    Ok(())
}
