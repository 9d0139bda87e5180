//! Data command handlers

use crate::commands::{CasesArgs, ResolveArgs, ShowArgs};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::Printer;
use appium_pom::{CaseResolver, Record, Resolution, TestCase, TestDataLoader};
use serde::Serialize;

/// Sections of one data file as seen from one environment
#[derive(Debug, Clone, Serialize)]
pub struct DataReport {
    /// Normalized file name
    pub file: String,
    /// Environment applied
    pub environment: String,
    /// `common` section
    pub common: Record,
    /// Environment data, already layered over the default environment
    pub environment_data: Record,
    /// Case names in file order
    pub cases: Vec<String>,
}

/// Case names of one data file
#[derive(Debug, Clone, Serialize)]
pub struct CasesReport {
    /// Normalized file name
    pub file: String,
    /// Case names in file order
    pub cases: Vec<String>,
}

/// Build the sections report for `file`
pub fn data_report(loader: &mut TestDataLoader, file: &str) -> CliResult<DataReport> {
    let data = loader.load_test_data(file)?;
    Ok(DataReport {
        file: TestDataLoader::normalize(file),
        environment: loader.active_environment().to_string(),
        common: data.common.clone(),
        environment_data: loader.get_environment_data(file, None)?,
        cases: data.case_names().into_iter().map(str::to_string).collect(),
    })
}

/// Build the case list for `file`
pub fn cases_report(loader: &mut TestDataLoader, file: &str) -> CliResult<CasesReport> {
    let data = loader.load_test_data(file)?;
    Ok(CasesReport {
        file: TestDataLoader::normalize(file),
        cases: data.case_names().into_iter().map(str::to_string).collect(),
    })
}

/// Execute `data show`
pub fn execute_show(cli: &CliConfig, args: &ShowArgs) -> CliResult<()> {
    let mut loader = TestDataLoader::new(&args.data_dir).with_environment(args.env.clone());
    let printer = Printer::new(args.format.into(), cli.use_color());
    match &args.case {
        Some(case) => {
            let case = loader.get_test_case_data(&args.file, case)?;
            render_case(&printer, &case)
        }
        None => render_data(&printer, &data_report(&mut loader, &args.file)?),
    }
}

/// Execute `data cases`
pub fn execute_cases(cli: &CliConfig, args: &CasesArgs) -> CliResult<()> {
    let mut loader = TestDataLoader::new(&args.data_dir);
    let report = cases_report(&mut loader, &args.file)?;
    let printer = Printer::new(args.format.into(), cli.use_color());
    if printer.is_json() {
        return printer.json(&report);
    }
    for name in &report.cases {
        printer.line(name)?;
    }
    Ok(())
}

/// Execute `data resolve`
pub fn execute_resolve(cli: &CliConfig, args: &ResolveArgs) -> CliResult<()> {
    let mut loader = TestDataLoader::new(&args.data_dir);
    let resolver = match &args.file {
        Some(file) => CaseResolver::new().with_data_file(file.clone()),
        None => CaseResolver::new(),
    };
    let resolution = resolver.resolve(&args.test_fn, &mut loader)?;
    render_resolution(&Printer::new(args.format.into(), cli.use_color()), &resolution)
}

fn render_data(printer: &Printer, report: &DataReport) -> CliResult<()> {
    if printer.is_json() {
        return printer.json(report);
    }
    printer.field("File", &report.file)?;
    printer.field("Environment", &report.environment)?;
    printer.field("Cases", report.cases.join(", "))?;
    printer.line("")?;
    printer.header("common")?;
    printer.record(&report.common)?;
    printer.header(&format!("environment: {}", report.environment))?;
    printer.record(&report.environment_data)
}

fn render_case(printer: &Printer, case: &TestCase) -> CliResult<()> {
    if printer.is_json() {
        return printer.json(case);
    }
    printer.header(&case.name)?;
    printer.record(&case.data)
}

fn render_resolution(printer: &Printer, resolution: &Resolution) -> CliResult<()> {
    if printer.is_json() {
        return printer.json(resolution);
    }
    printer.field("Test", &resolution.test_name)?;
    printer.field(
        "Case",
        format!("{} ({})", resolution.case, resolution.rule),
    )?;
    printer.field("File", TestDataLoader::normalize(&resolution.data_file))?;
    printer.field("Tried", resolution.candidates.join(", "))
}
