//! baker binary - serialize XML and write a source map for the output

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use baker::{Job, Options, convert_file};
use baker_xml::{Method, ParseOptions, SerializeOptions};

#[derive(Parser, Debug)]
#[command(name = "baker")]
#[command(about = "Serialize an XML document and write a source map for it", long_about = None)]
struct Args {
    /// Input document (`-` for stdin)
    #[arg(value_name = "HTML_IN")]
    html_in: PathBuf,

    /// Output document (`-` for stdout)
    #[arg(value_name = "HTML_OUT")]
    html_out: PathBuf,

    /// Write the source map of the output here
    #[arg(long, value_name = "FILE")]
    source_map: Option<PathBuf>,

    /// Source map of the input, if it was generated
    #[arg(long, value_name = "FILE")]
    source_map_input: Option<PathBuf>,

    /// Namespace to write without a prefix
    #[arg(long, value_name = "URI")]
    default_namespace: Option<String>,

    /// Write empty elements as `<tag></tag>`
    #[arg(long)]
    no_short_empty_elements: bool,

    /// Start the output with an XML declaration
    #[arg(long)]
    xml_declaration: bool,

    /// Output method
    #[arg(long, value_enum, default_value_t = OutputMethod::Xml)]
    method: OutputMethod,

    /// Keep comments from the input
    #[arg(long)]
    keep_comments: bool,

    /// Keep processing instructions from the input
    #[arg(long)]
    keep_pis: bool,

    /// Send debugging info to stderr
    #[arg(short, long)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputMethod {
    Xml,
    Text,
}

impl From<OutputMethod> for Method {
    fn from(method: OutputMethod) -> Self {
        match method {
            OutputMethod::Xml => Method::Xml,
            OutputMethod::Text => Method::Text,
        }
    }
}

impl Args {
    fn job(&self) -> Job {
        Job {
            html_in: self.html_in.clone(),
            html_out: self.html_out.clone(),
            source_map: self.source_map.clone(),
            source_map_input: self.source_map_input.clone(),
        }
    }

    fn options(&self) -> Options {
        Options {
            parse: ParseOptions {
                insert_comments: self.keep_comments,
                insert_pis: self.keep_pis,
            },
            serialize: SerializeOptions {
                short_empty_elements: !self.no_short_empty_elements,
                default_namespace: self.default_namespace.clone(),
                xml_declaration: self.xml_declaration,
                method: self.method.into(),
                ..Default::default()
            },
        }
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.debug);

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    convert_file(&args.job(), &args.options())
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("baker=debug,baker_xml=debug,baker_source_map=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "baker=info".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
