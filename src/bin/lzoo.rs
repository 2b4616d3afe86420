use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use lzoo::{compress, compress_stream, decompress, Algorithm};

/// Algorithm argument for the CLI (maps to [`Algorithm`])
#[derive(Clone, Copy, Debug, ValueEnum)]
enum AlgorithmArg {
    /// Huffman coding (two passes; not available from stdin)
    Huf,
    /// LZ77 sliding window
    Lz77,
    /// LZ78 grown dictionary
    Lz78,
    /// LZW seeded dictionary
    Lzw,
}

impl AlgorithmArg {
    fn to_algorithm(self) -> Algorithm {
        match self {
            Self::Huf => Algorithm::Huffman,
            Self::Lz77 => Algorithm::Lz77,
            Self::Lz78 => Algorithm::Lz78,
            Self::Lzw => Algorithm::Lzw,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "lzoo")]
#[command(about = "Compress and decompress files with classical lossless algorithms")]
#[command(version)]
struct Args {
    /// Compress PATH (use - for stdin)
    #[arg(short = 'c', long, value_name = "PATH", required_unless_present = "extract")]
    compress: Option<PathBuf>,

    /// Decompress PATH (use - for stdin)
    #[arg(short = 'x', long = "extract", value_name = "PATH", conflicts_with = "compress")]
    extract: Option<PathBuf>,

    /// Compression algorithm (ignored when decompressing; the magic
    /// number decides)
    #[arg(short = 'a', long, value_enum, default_value = "lzw")]
    algorithm: AlgorithmArg,

    /// Output file (use - for stdout)
    #[arg(short = 'o', long, value_name = "PATH", default_value = "-")]
    output: PathBuf,

    /// Show size statistics on stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Writer wrapper that counts bytes for the statistics report
struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reader wrapper that counts bytes read from stdin
struct CountingReader<R: Read> {
    inner: R,
    read: u64,
}

impl<R: Read> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, read: 0 }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        Ok(n)
    }
}

fn is_stdio(path: &Path) -> bool {
    path.to_str() == Some("-")
}

fn open_output(path: &Path) -> io::Result<Box<dyn Write>> {
    if is_stdio(path) {
        Ok(Box::new(io::stdout().lock()))
    } else {
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

fn report(verbose: bool, label: &str, bytes_in: u64, bytes_out: u64) {
    if !verbose {
        return;
    }
    eprintln!("{} complete:", label);
    eprintln!("  Input bytes:      {}", bytes_in);
    eprintln!("  Output bytes:     {}", bytes_out);
    if bytes_in > 0 {
        eprintln!("  Ratio:            {:.3}", bytes_out as f64 / bytes_in as f64);
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version report through here with success
            e.print()?;
            return if e.use_stderr() { Err("invalid arguments".into()) } else { Ok(()) };
        }
    };

    let mut output = CountingWriter::new(open_output(&args.output)?);

    if let Some(input_path) = &args.extract {
        let bytes_in = if is_stdio(input_path) {
            let mut input = CountingReader::new(io::stdin().lock());
            decompress(&mut input, &mut output)?;
            input.read
        } else {
            let input = BufReader::new(File::open(input_path)?);
            decompress(input, &mut output)?;
            std::fs::metadata(input_path)?.len()
        };
        output.flush()?;
        report(args.verbose, "Decompression", bytes_in, output.written);
        return Ok(());
    }

    let input_path = args.compress.as_ref().ok_or("nothing to do")?;
    let algorithm = args.algorithm.to_algorithm();

    let bytes_in = if is_stdio(input_path) {
        // No seeking on a pipe, so Huffman is rejected inside.
        let mut input = CountingReader::new(io::stdin().lock());
        compress_stream(algorithm, &mut input, &mut output)?;
        input.read
    } else {
        let input = BufReader::new(File::open(input_path)?);
        compress(algorithm, input, &mut output)?;
        std::fs::metadata(input_path)?.len()
    };
    output.flush()?;
    report(args.verbose, "Compression", bytes_in, output.written);
    Ok(())
}
