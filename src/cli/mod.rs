// FILE: src/cli/mod.rs

mod config;
mod handlers;

use crate::error::{Result, TokenError};
use crate::ConverterOptions;
use clap::{Arg, ArgAction, Command, ValueEnum};
use std::time::Instant;

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Debug,
}

pub struct TokenCli {
    config: config::ConfigFile,
    start_time: Instant,
}

impl TokenCli {
    pub fn new() -> Self {
        Self {
            config: config::ConfigFile::default(),
            start_time: Instant::now(),
        }
    }

    /// Run the CLI; returns the process exit code
    pub fn run(&mut self) -> Result<i32> {
        self.start_time = Instant::now();
        let matches = self.build_cli().get_matches();

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        self.setup_logging(matches.get_count("verbose"))?;

        let code = match matches.subcommand() {
            Some(("convert", sub_matches)) => handlers::handle_convert_command(self, sub_matches)?,
            Some(("check", sub_matches)) => handlers::handle_check_command(self, sub_matches)?,
            Some(("explain", sub_matches)) => handlers::handle_explain_command(self, sub_matches)?,
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                0
            }
        };
        log::debug!("Finished in {}ms", self.start_time.elapsed().as_millis());
        Ok(code)
    }

    fn input_arg() -> Arg {
        Arg::new("inputs")
            .help("Token JSON files or directories")
            .required(true)
            .num_args(1..)
            .index(1)
    }

    fn collection_arg() -> Arg {
        Arg::new("collection")
            .short('c')
            .long("collection")
            .value_name("NAME")
            .help("Collection name (also stripped from references)")
    }

    fn base_font_size_arg() -> Arg {
        Arg::new("base-font-size")
            .long("base-font-size")
            .value_name("PX")
            .value_parser(clap::value_parser!(f64))
            .help("Base font size for rem/em/% conversion")
    }

    fn build_cli(&self) -> Command {
        Command::new(crate::NAME)
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .author("Kryon Development Team")
            .arg(
                Arg::new("config")
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.json or .toml)")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .action(ArgAction::Count),
            )
            .subcommand(
                Command::new("convert")
                    .about("Convert design tokens and resolve aliases")
                    .arg(Self::input_arg())
                    .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Write the import report to FILE"))
                    .arg(Self::collection_arg())
                    .arg(Self::base_font_size_arg())
                    .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(OutputFormat)).default_value("json").help("Output format"))
                    .arg(Arg::new("debug").short('d').long("debug").help("Enable per-token debug logging").action(ArgAction::SetTrue))
                    .arg(Arg::new("stats").long("stats").help("Show detailed import statistics").action(ArgAction::SetTrue))
                    .arg(Arg::new("watch").short('w').long("watch").help("Watch inputs for changes and convert again").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("check")
                    .about("Convert tokens and report problems without writing output")
                    .arg(Self::input_arg())
                    .arg(Self::collection_arg())
                    .arg(Self::base_font_size_arg()),
            )
            .subcommand(
                Command::new("explain")
                    .about("Show how a reference is looked up")
                    .arg(Self::input_arg())
                    .arg(Self::collection_arg())
                    .arg(Self::base_font_size_arg())
                    .arg(Arg::new("reference").short('r').long("reference").value_name("REF").required(true).help("Reference to look up, with or without braces")),
            )
    }

    fn setup_logging(&self, verbose_count: u8) -> Result<()> {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .try_init()
            .map_err(|e| TokenError::InvalidFormat {
                message: format!("Failed to initialize logging: {}", e),
            })
    }

    /// Options from the config file, overridden by command-line flags
    pub fn build_converter_options(&self, matches: &clap::ArgMatches) -> Result<ConverterOptions> {
        let mut options = ConverterOptions::default();

        if let Some(collection) = &self.config.collection {
            options.collection = collection.clone();
        }
        if let Some(base) = self.config.base_font_size {
            options.base_font_size = base;
        }
        if let Some(prefixes) = &self.config.collection_prefixes {
            options.collection_prefixes = prefixes.clone();
        }
        if let Some(separator) = &self.config.name_separator {
            options.name_separator = separator.clone();
        }
        options.debug_mode = self.config.debug_mode.unwrap_or(false);

        // Subcommands define different flags; a missing id reads as unset
        if let Some(collection) = matches.try_get_one::<String>("collection").ok().flatten() {
            options.collection = collection.clone();
        }
        if let Some(base) = matches.try_get_one::<f64>("base-font-size").ok().flatten() {
            options.base_font_size = *base;
        }
        if matches.try_get_one::<bool>("debug").ok().flatten().copied().unwrap_or(false) {
            options.debug_mode = true;
        }

        if !(options.base_font_size.is_finite() && options.base_font_size > 0.0) {
            return Err(TokenError::invalid(
                "baseFontSize",
                options.base_font_size,
                "must be a positive number",
            ));
        }
        Ok(options)
    }

    pub fn output_file(&self, matches: &clap::ArgMatches) -> Option<String> {
        matches
            .try_get_one::<String>("output")
            .ok()
            .flatten()
            .cloned()
            .or_else(|| self.config.output_file.clone())
    }
}

impl Default for TokenCli {
    fn default() -> Self {
        Self::new()
    }
}
