mod description;
mod summary;

use bbox::codegen::{Codegen, CodegenError, ExtModuleCodegen};
use bbox::DesignError;
use clap::{command, Arg};
use description::DesignDescription;
use log::info;
use miette::Diagnostic;
use std::fs;
use std::io;
use std::io::Write;
use summary::DesignSummary;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DriverError {
	#[error(transparent)]
	#[diagnostic(code(bboxc::io_error))]
	IoError(#[from] io::Error),

	#[error("Malformed design description")]
	#[diagnostic(
		code(bboxc::description),
		help("expected an object with an 'instances' list, each naming a 'module' declaration")
	)]
	DescriptionError(#[from] serde_json::Error),

	#[error("Failed to write design summary")]
	#[diagnostic(code(bboxc::summary))]
	SummaryError(#[source] serde_json::Error),

	#[error("Elaboration of instance '{instance}' failed")]
	#[diagnostic(code(bboxc::elab))]
	ElabError {
		instance: String,
		#[source]
		source: DesignError,
	},

	#[error(transparent)]
	#[diagnostic(code(bboxc::codegen))]
	CodegenError(#[from] CodegenError),
}

fn run(source: &str, format: &str, mut output: Box<dyn Write>) -> Result<(), DriverError> {
	let content = fs::read_to_string(source)?;
	let description = DesignDescription::from_json(&content)?;
	let design = description.elaborate()?;

	info!(
		"Elaborated {} instances into {} external modules",
		design.instances().len(),
		design.ext_modules().len()
	);

	match format {
		"json" => {
			let summary = DesignSummary::new(&design);
			serde_json::to_writer_pretty(&mut output, &summary).map_err(DriverError::SummaryError)?;
			writeln!(output)?;
		},
		_ => {
			let mut text = String::new();
			ExtModuleCodegen::new(&design, &mut text).emit_design()?;
			output.write_all(text.as_bytes())?;
		},
	}

	output.flush()?;
	Ok(())
}

fn main() -> miette::Result<()> {
	env_logger::init();

	let matches = command!()
		.arg(Arg::new("source").required(true).help("JSON design description"))
		.arg(
			Arg::new("output")
				.short('o')
				.long("output")
				.help("Output file (defaults to standard output)"),
		)
		.arg(
			Arg::new("format")
				.short('f')
				.long("format")
				.value_parser(["text", "json"])
				.default_value("text")
				.help("Specify how external module records are printed"),
		)
		.get_matches();

	let source = match matches.get_one::<String>("source") {
		None => "",
		Some(x) => x,
	};

	let format = match matches.get_one::<String>("format") {
		None => "text",
		Some(x) => x,
	};

	let output: Box<dyn Write> = match matches.get_one::<String>("output") {
		None => Box::new(io::stdout()),
		Some(path) => match fs::File::create(path) {
			Ok(file) => Box::new(file),
			Err(err) => return Err(DriverError::IoError(err).into()),
		},
	};

	run(source, format, output)?;
	Ok(())
}
