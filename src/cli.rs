use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use flowdraw::{Diagram, Orientation, Theme};

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone)]
enum OutputDestination {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Parser)]
#[command(
    name = "flowdraw",
    about = "Lay out a JSON flowchart and emit its scene as JSON or SVG."
)]
pub struct RenderArgs {
    /// Path to the flowchart definition. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Path to the output file. Use '-' to write to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Output format (defaults to the output file extension or json).
    #[arg(short = 'e', long = "output-format", value_enum)]
    output_format: Option<OutputFormat>,

    /// Layout direction for the levels.
    #[arg(long = "orientation", value_enum, default_value_t = OrientationArg::Landscape)]
    orientation: OrientationArg,

    /// Colour theme key (see `flowdraw themes`).
    #[arg(long = "theme", default_value = "modern", value_parser = parse_theme)]
    theme: Theme,

    /// Background color for the rendered diagram (svg only).
    #[arg(short = 'b', long = "background-color", default_value = "white")]
    background_color: String,

    /// Treat the input as free-form generated text and extract the JSON from it.
    #[arg(long = "from-model-response", action = ArgAction::SetTrue)]
    from_model_response: bool,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    /// Enable debug logging on stderr.
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Svg,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OrientationArg {
    Landscape,
    Portrait,
}

impl OutputFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
        {
            Some(ext) if ext == "json" => Some(OutputFormat::Json),
            Some(ext) if ext == "svg" => Some(OutputFormat::Svg),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Svg => "svg",
        }
    }
}

impl From<OrientationArg> for Orientation {
    fn from(value: OrientationArg) -> Self {
        match value {
            OrientationArg::Landscape => Orientation::Landscape,
            OrientationArg::Portrait => Orientation::Portrait,
        }
    }
}

fn parse_theme(key: &str) -> Result<Theme, String> {
    Theme::from_key(key).ok_or_else(|| {
        let known: Vec<&str> = Theme::ALL.iter().map(|theme| theme.key()).collect();
        format!("unknown theme '{key}' (expected one of: {})", known.join(", "))
    })
}

pub fn dispatch() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("themes") => run_themes(),
        Some("render") => {
            let render_args = RenderArgs::parse_from(
                std::iter::once(args[0].clone()).chain(args.iter().skip(2).cloned()),
            );
            run_render(render_args)
        }
        _ => {
            let render_args = RenderArgs::parse_from(args);
            run_render(render_args)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_themes() -> Result<()> {
    let mut stdout = io::stdout();
    for theme in Theme::ALL {
        writeln!(stdout, "{:<12} {}", theme.key(), theme.name())?;
    }
    stdout.flush()?;
    Ok(())
}

fn run_render(cli: RenderArgs) -> Result<()> {
    init_logging(cli.verbose);

    let input_source = parse_input(cli.input.as_deref())?;
    let output_dest = parse_output(cli.output.as_deref(), &input_source, cli.output_format)?;
    let format = determine_format(cli.output_format, &output_dest)?;

    let definition = load_definition(&input_source)?;
    let diagram = if cli.from_model_response {
        Diagram::from_model_response(&definition)
    } else {
        Diagram::parse(&definition)
    }
    .context("failed to read flowchart definition")?;

    let orientation = Orientation::from(cli.orientation);
    debug!(
        nodes = diagram.nodes().len(),
        orientation = orientation.as_str(),
        theme = cli.theme.key(),
        "rendering flowchart"
    );

    let scene = diagram.scene(orientation, cli.theme);
    if scene.nodes.len() < diagram.nodes().len() {
        info!(
            unreachable = diagram.nodes().len() - scene.nodes.len(),
            "some nodes are not reachable from any root and were left out"
        );
    }

    let output = match format {
        OutputFormat::Json => scene.to_json()?,
        OutputFormat::Svg => scene.render_svg(cli.theme, &cli.background_color)?,
    };

    write_output(output_dest, output.as_bytes(), cli.quiet)
}

fn parse_input(input: Option<&str>) -> Result<InputSource> {
    match input {
        Some("-") => Ok(InputSource::Stdin),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.exists() {
                return Err(anyhow!("input file '{path_str}' does not exist"));
            }
            Ok(InputSource::File(path))
        }
        None => Ok(InputSource::Stdin),
    }
}

fn parse_output(
    output: Option<&str>,
    input: &InputSource,
    format_hint: Option<OutputFormat>,
) -> Result<OutputDestination> {
    match output {
        Some("-") => Ok(OutputDestination::Stdout),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(anyhow!(
                        "output directory '{}' does not exist",
                        parent.display()
                    ));
                }
            }
            Ok(OutputDestination::File(path))
        }
        None => match input {
            InputSource::File(path) => {
                let ext = format_hint.unwrap_or(OutputFormat::Json).extension();
                let default_name = path
                    .file_stem()
                    .and_then(|name| name.to_str())
                    .map(|name| format!("{name}.scene.{ext}"))
                    .unwrap_or_else(|| format!("scene.{ext}"));
                let mut default_path = path.to_path_buf();
                default_path.set_file_name(default_name);
                Ok(OutputDestination::File(default_path))
            }
            InputSource::Stdin => Ok(OutputDestination::Stdout),
        },
    }
}

fn determine_format(
    preference: Option<OutputFormat>,
    output: &OutputDestination,
) -> Result<OutputFormat> {
    if let Some(fmt) = preference {
        return Ok(fmt);
    }

    match output {
        OutputDestination::Stdout => Ok(OutputFormat::Json),
        OutputDestination::File(path) => match OutputFormat::from_path(path) {
            Some(fmt) => Ok(fmt),
            None if path.extension().is_none() => Ok(OutputFormat::Json),
            None => bail!(
                "unable to determine output format from '{}'; please specify --output-format",
                path.display()
            ),
        },
    }
}

fn load_definition(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            if buffer.trim().is_empty() {
                Err(anyhow!("no flowchart definition supplied on stdin"))
            } else {
                Ok(buffer)
            }
        }
        InputSource::File(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            if contents.trim().is_empty() {
                Err(anyhow!("input file '{}' was empty", path.display()))
            } else {
                Ok(contents)
            }
        }
    }
}

fn write_output(dest: OutputDestination, bytes: &[u8], quiet: bool) -> Result<()> {
    match dest {
        OutputDestination::Stdout => {
            let mut stdout = io::stdout();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
        OutputDestination::File(path) => {
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            if !quiet {
                println!("Generated flowchart -> {}", path.display());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_the_output_extension() {
        let svg = OutputDestination::File(PathBuf::from("chart.SVG"));
        let bare = OutputDestination::File(PathBuf::from("chart"));
        let png = OutputDestination::File(PathBuf::from("chart.png"));

        assert_eq!(determine_format(None, &svg).unwrap(), OutputFormat::Svg);
        assert_eq!(determine_format(None, &bare).unwrap(), OutputFormat::Json);
        assert_eq!(
            determine_format(None, &OutputDestination::Stdout).unwrap(),
            OutputFormat::Json
        );
        assert!(determine_format(None, &png).is_err());
        assert_eq!(
            determine_format(Some(OutputFormat::Svg), &png).unwrap(),
            OutputFormat::Svg
        );
    }

    #[test]
    fn default_output_sits_next_to_the_input() {
        let input = InputSource::File(PathBuf::from("charts/support.json"));
        match parse_output(None, &input, Some(OutputFormat::Svg)).unwrap() {
            OutputDestination::File(path) => {
                assert_eq!(path, PathBuf::from("charts/support.scene.svg"))
            }
            OutputDestination::Stdout => panic!("expected a file destination"),
        }
    }

    #[test]
    fn theme_keys_are_validated() {
        assert_eq!(parse_theme("Tech").unwrap(), Theme::Tech);
        let err = parse_theme("neon").unwrap_err();
        assert!(err.contains("modern"));
    }

    #[test]
    fn render_args_accept_subcommand_free_invocation() {
        let args = RenderArgs::parse_from([
            "flowdraw",
            "-i",
            "chart.json",
            "--orientation",
            "portrait",
            "--theme",
            "finance",
            "-v",
        ]);
        assert_eq!(args.orientation, OrientationArg::Portrait);
        assert_eq!(args.theme, Theme::Finance);
        assert!(args.verbose);
        assert!(!args.from_model_response);
    }
}
