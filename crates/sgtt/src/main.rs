use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use sgtt::discover::{DiscoverOptions, Project, discover};
use sgtt::naming::output_name;
use sgtt::{GenerateOptions, Outcome, RenderRequest, Renderer, SgttConfig, generate, logging, report};
use sgtt_runtime::CancelFlag;
use sgtt_template::{FileSource, ResolveOptions};

#[derive(Parser)]
#[command(name = "sgtt")]
#[command(version)]
#[command(about = "Render source-generator text templates")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Project root
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render every template of the project and write the generated files
    Generate {
        /// Output directory (overrides [output].dir)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Locale the generator programs run under
        #[arg(long, value_name = "NAME")]
        locale: Option<String>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render one template to stdout
    Render {
        /// Template file
        template: PathBuf,

        /// Directory searched for include files (repeatable; defaults to the template's directory)
        #[arg(long = "include", value_name = "DIR")]
        include: Vec<PathBuf>,

        /// Locale the generator program runs under
        #[arg(long, value_name = "NAME")]
        locale: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = SgttConfig::load(&cli.root).context("loading configuration")?;

    match cli.command {
        Command::Generate { out, locale, json } => {
            cmd_generate(&cli.root, &config, out, locale, json)
        }
        Command::Render {
            template,
            include,
            locale,
        } => cmd_render(&config, &template, &include, locale),
    }
}

fn cmd_generate(
    root: &Path,
    config: &SgttConfig,
    out: Option<PathBuf>,
    locale: Option<String>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let mut options = GenerateOptions::from_config(root, config)?;
    if let Some(out) = out {
        options.output_dir = root.join(out);
    }
    if locale.is_some() {
        options.locale = locale;
    }

    let summary = generate(&options, &CancelFlag::new())?;

    if json {
        println!("{}", report::to_json(&summary)?);
    } else {
        for file in &summary.files {
            println!("{} -> {}", file.template.display(), file.path.display());
        }
        let diagnostics: Vec<_> = summary.diagnostics().cloned().collect();
        let mut stderr = StandardStream::stderr(ColorChoice::Auto);
        report::emit(&mut stderr, &diagnostics)?;
    }

    let failed = summary.files.iter().any(|f| f.outcome != Outcome::Rendered);
    Ok(if failed || summary.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn cmd_render(
    config: &SgttConfig,
    template: &Path,
    include_dirs: &[PathBuf],
    locale: Option<String>,
) -> anyhow::Result<ExitCode> {
    let discover_options = DiscoverOptions {
        template_extension: config.template_extension().to_string(),
        include_extension: config.include_extension().to_string(),
        skip: Vec::new(),
    };
    let default_dir = [template
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf()];
    let dirs = if include_dirs.is_empty() {
        &default_dir[..]
    } else {
        include_dirs
    };

    let mut project = Project::default();
    for dir in dirs {
        project.extend(discover(dir, &discover_options));
    }
    let includes = project.include_lookup();

    let renderer = Renderer::new(
        config.libraries()?,
        ResolveOptions {
            include_extension: config.include_extension().to_string(),
        },
    );
    let source = FileSource::new(template);
    let file_name = output_name(template, 0, config.output_extension());
    let locale = locale.or_else(|| config.locale().map(str::to_string));
    let request = RenderRequest {
        template: &source,
        includes: &includes,
        file_name: &file_name,
        locale: locale.as_deref(),
    };

    let Some(generated) = renderer.render(&request, &CancelFlag::new()) else {
        bail!("could not render {}", template.display());
    };

    print!("{}", generated.text);
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    report::emit(&mut stderr, &generated.diagnostics)?;

    Ok(if generated.outcome == Outcome::Rendered {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
