//! Schema command implementation.

use crate::cli::SchemaArgs;
use crate::commands::read_document;
use crate::config::load_workflow_config;
use crate::error::Result;
use crate::output::Formatter;
use reframe_gatekeeper::infer_schema;

/// Execute the schema command.
pub fn execute_schema(args: SchemaArgs, formatter: &Formatter) -> Result<()> {
    let document = read_document(&args.input)?;

    let source = if args.subset {
        let workflow = load_workflow_config(args.workflow_config.as_deref())?;
        workflow.extract_subset(&document)?
    } else {
        document
    };

    println!("{}", formatter.format_schema(&infer_schema(&source))?);
    Ok(())
}
