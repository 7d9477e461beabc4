use arucas::{
    environment::context::StdioContext,
    error::{
        formatter::{BasicFormatter, ErrorFormatter, ReportFormatter},
        CodeError, ErrorKind,
    },
    value::{
        formatter::{ValueFormatter, VerboseFormatter},
        ValueKind,
    },
    Interpreter, SourceFile,
};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::{fs::read_to_string, process::ExitCode};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[clap(name = "arucas", version)]
pub struct CLArgs {
    #[clap(subcommand)]
    pub routine: ArucasCommand,
}

#[derive(Debug, Subcommand)]
pub enum ArucasCommand {
    /// Runs a script file.
    Run {
        path: PathBuf,
        #[clap(long = "format", value_enum, default_value = "basic")]
        format: ErrorFormat,
    },
    /// Runs source text given on the command line.
    Eval {
        source: String,
        #[clap(long = "format", value_enum, default_value = "basic")]
        format: ErrorFormat,
    },
    Tokenize {
        path: PathBuf,
        #[clap(long = "format", value_enum, default_value = "basic")]
        format: TokenFormat,
    },
    Parse {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum TokenFormat {
    Debug,
    Basic,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ErrorFormat {
    Basic,
    Pretty,
}

fn main() -> ExitCode {
    match arucas_main() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn arucas_main() -> Result<ExitCode> {
    color_eyre::install()?;
    init_tracing();
    let args = CLArgs::parse();
    match args.routine {
        ArucasCommand::Run { path, format } => {
            let src = read_to_string(&path)?;
            Ok(run(&path.to_string_lossy(), &src, &format, false))
        }
        ArucasCommand::Eval { source, format } => Ok(run("<string>", &source, &format, true)),
        ArucasCommand::Tokenize { path, format } => {
            eprintln!("Tokenizing {:?}...", path);
            let src = read_to_string(path)?;
            Ok(tokenize(&src, &format))
        }
        ArucasCommand::Parse { path } => {
            eprintln!("Parsing {:?}...", path);
            let src = read_to_string(&path)?;
            Ok(parse(&path.to_string_lossy(), &src))
        }
    }
}

fn exit_code(error: &CodeError) -> ExitCode {
    match error.kind {
        ErrorKind::IllegalCharacter | ErrorKind::IllegalSyntax | ErrorKind::ExpectedCharacter => {
            ExitCode::from(65)
        }
        _ => ExitCode::from(70),
    }
}

/// Runs a program to completion. `echo` prints a non-null final value.
fn run(display_name: &str, src: &str, format: &ErrorFormat, echo: bool) -> ExitCode {
    let mut interpreter = Interpreter::new(Arc::new(StdioContext));
    let result = interpreter.run(display_name, src);
    interpreter.join_threads();
    match result {
        Ok(value) => {
            if echo && !matches!(value.kind, ValueKind::Null) {
                println!("{}", VerboseFormatter.format(&value));
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            let formatter: Box<dyn ErrorFormatter> = match format {
                ErrorFormat::Basic => Box::new(BasicFormatter),
                ErrorFormat::Pretty => Box::new(ReportFormatter),
            };
            eprintln!("{}", formatter.format_error(&error));
            exit_code(&error)
        }
    }
}

fn tokenize(src: &str, format: &TokenFormat) -> ExitCode {
    use arucas::lexer::formatter::{BasicFormatter, DebugFormatter, ToFormatter, TokenFormatter};
    use arucas::lexer::{Lexer, TokenKind};

    let mut scanner = Lexer::new(src);
    let formatter: Box<dyn TokenFormatter> = match format {
        TokenFormat::Debug => Box::new(ToFormatter::<DebugFormatter>::create_formatter(&scanner)),
        TokenFormat::Basic => Box::new(ToFormatter::<BasicFormatter>::create_formatter(&scanner)),
    };
    let mut succeeded = true;
    loop {
        match scanner.next_token() {
            Ok(token) => {
                println!("{}", formatter.format(&token));
                if matches!(token.kind, TokenKind::Eof) {
                    break;
                }
            }
            Err(error) => {
                eprintln!("{}", formatter.format_lexical_error(&error));
                succeeded = false;
            }
        };
    }
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(65)
    }
}

fn parse(display_name: &str, src: &str) -> ExitCode {
    use arucas::parser::Parser;

    let file = SourceFile::new(display_name, src);
    match Parser::new(&file).parse() {
        Ok(program) => {
            println!("{:#?}", program.body);
            ExitCode::SUCCESS
        }
        Err(error) => {
            let error = CodeError::from(error).with_file(&file);
            eprintln!("{}", BasicFormatter.format_error(&error));
            ExitCode::from(65)
        }
    }
}
