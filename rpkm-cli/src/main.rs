use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use std::path::Path;
use rpkm::{BatchConfig, PathwaySelection, Suffixes};

fn delimiter_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("delimiter")
        .long("delimiter")
        .short("d")
        .help("Column separator of the input and output files (default: tab)")
        .takes_value(true)
        .validator(|value| parse_delimiter(&value).map(|_| ()))
}

fn app<'a, 'b>() -> clap::App<'a, 'b> {
    App::new("rpkm")
        .about("Correlates pathway annotations with per-ORF RPKM readings")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(SubCommand::with_name("correlate")
            .about("Sums RPKM readings per pathway for a single sample")
            .arg(Arg::with_name("pathways")
                .help("Pathway information file")
                .required(true))
            .arg(Arg::with_name("readings")
                .help("ORF RPKM data file")
                .required(true))
            .arg(Arg::with_name("output")
                .help("Output file")
                .default_value("pwy_data.tsv"))
            .arg(delimiter_arg()))
        .subcommand(SubCommand::with_name("batch")
            .about("Combines the pathway sums of every sample in a folder into one table")
            .arg(Arg::with_name("dir")
                .help("Folder of pathway information and RPKM data files")
                .required(true))
            .arg(Arg::with_name("output")
                .help("Output file")
                .default_value("pwy_data_batch.tsv"))
            .arg(Arg::with_name("exclude_zeroes")
                .long("exclude-zeroes")
                .help("Average only over samples and pathways with a non-zero sum"))
            .arg(Arg::with_name("separate_stats")
                .long("separate-stats")
                .help("Write per-sample statistics to <output stem>.stats.<ext>"))
            .arg(Arg::with_name("pwy_suffix")
                .long("pwy-suffix")
                .takes_value(true)
                .default_value(Suffixes::DEFAULT_PATHWAY))
            .arg(Arg::with_name("rpkm_suffix")
                .long("rpkm-suffix")
                .takes_value(true)
                .default_value(Suffixes::DEFAULT_READING))
            .arg(delimiter_arg()))
        .subcommand(SubCommand::with_name("annotate")
            .about("Lists the RPKM reading and annotation of every ORF in every pathway")
            .arg(Arg::with_name("dir")
                .help("Folder of pathway information, RPKM data, and annotation files")
                .required(true))
            .arg(Arg::with_name("output")
                .help("Output file")
                .default_value("pwy_anno.tsv"))
            .arg(Arg::with_name("select_pathways")
                .long("select-pathways")
                .help("Comma separated file whose first column lists the pathways to output")
                .takes_value(true))
            .arg(Arg::with_name("anno_suffix")
                .long("anno-suffix")
                .help("Filename suffix of the annotation files")
                .takes_value(true)
                .default_value(Suffixes::DEFAULT_ANNOTATION))
            .arg(Arg::with_name("pwy_suffix")
                .long("pwy-suffix")
                .takes_value(true)
                .default_value(Suffixes::DEFAULT_PATHWAY))
            .arg(Arg::with_name("rpkm_suffix")
                .long("rpkm-suffix")
                .takes_value(true)
                .default_value(Suffixes::DEFAULT_READING))
            .arg(delimiter_arg()))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = app().get_matches();

    if let Err(e) = run(&matches) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "\\t" | "tab" => Ok(b'\t'),
        _ if value.len() == 1 && value.is_ascii() => Ok(value.as_bytes()[0]),
        _ => Err(format!("delimiter must be a single ASCII character, got {:?}", value)),
    }
}

fn config_from(args: &ArgMatches) -> rpkm::Result<BatchConfig> {
    let mut config = BatchConfig::default();
    if let Some(delimiter) = args.value_of("delimiter") {
        // Already checked by the argument validator.
        config.delimiter = parse_delimiter(delimiter).unwrap_or(rpkm::DEFAULT_DELIMITER);
    }
    if let Some(suffix) = args.value_of("pwy_suffix") {
        config.suffixes.pathway = suffix.to_string();
    }
    if let Some(suffix) = args.value_of("rpkm_suffix") {
        config.suffixes.reading = suffix.to_string();
    }
    if let Some(suffix) = args.value_of("anno_suffix") {
        config.suffixes.annotation = Some(suffix.to_string());
    }
    if let Some(path) = args.value_of("select_pathways") {
        config.selection = Some(PathwaySelection::load(Path::new(path))?);
    }
    config.exclude_zeroes = args.is_present("exclude_zeroes");
    config.separate_stats = args.is_present("separate_stats");
    Ok(config)
}

fn run(matches: &ArgMatches) -> rpkm::Result<()> {
    match matches.subcommand() {
        ("correlate", Some(args)) => {
            let config = config_from(args)?;
            // Positional arguments are required or defaulted, so these are always present.
            let pathways = args.value_of("pathways").unwrap_or_default();
            let readings = args.value_of("readings").unwrap_or_default();
            let output = args.value_of("output").unwrap_or_default();
            rpkm::run_correlate(Path::new(pathways), Path::new(readings), Path::new(output), config.delimiter)?;
        }
        ("batch", Some(args)) => {
            let config = config_from(args)?;
            let dir = args.value_of("dir").unwrap_or_default();
            let output = args.value_of("output").unwrap_or_default();
            let report = rpkm::run_batch(Path::new(dir), Path::new(output), &config)?;
            log::info!("{} samples combined, {} skipped, {} missing RPKM data points, {} unused RPKM data points",
                report.summary.samples.len(), report.discovery.missing.len(),
                report.missing_readings, report.unreferenced_readings);
        }
        ("annotate", Some(args)) => {
            let config = config_from(args)?;
            let dir = args.value_of("dir").unwrap_or_default();
            let output = args.value_of("output").unwrap_or_default();
            rpkm::run_annotate(Path::new(dir), Path::new(output), &config)?;
        }
        _ => unreachable!(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(","), Ok(b','));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn test_batch_flags() {
        let matches = app().get_matches_from(vec![
            "rpkm", "batch", "data", "out.tsv", "--exclude-zeroes", "--separate-stats", "-d", ",",
        ]);
        let (name, args) = matches.subcommand();
        assert_eq!(name, "batch");
        let config = config_from(args.unwrap()).unwrap();
        assert!(config.exclude_zeroes);
        assert!(config.separate_stats);
        assert_eq!(config.delimiter, b',');
        assert_eq!(config.suffixes.annotation, None);
    }

    #[test]
    fn test_annotate_defaults() {
        let matches = app().get_matches_from(vec!["rpkm", "annotate", "data", "--anno-suffix", ".kegg.txt"]);
        let args = matches.subcommand_matches("annotate").unwrap();
        assert_eq!(args.value_of("output"), Some("pwy_anno.tsv"));
        let config = config_from(args).unwrap();
        assert_eq!(config.suffixes.annotation.as_deref(), Some(".kegg.txt"));
        assert_eq!(config.suffixes.pathway, Suffixes::DEFAULT_PATHWAY);
        assert!(config.selection.is_none());
    }

    #[test]
    fn test_missing_directory_is_usage_error() {
        assert!(app().get_matches_from_safe(vec!["rpkm", "batch"]).is_err());
    }
}
