use driver::{run_benchmark, Args, USAGE};

fn main() {
  let args: Vec<String> = std::env::args().collect();
  if args.len() != 9 {
    eprintln!("Usage: {} {}", args[0], USAGE);
    std::process::exit(1);
  }
  let args = match Args::parse(&args[1..]) {
    Ok(args) => args,
    Err(e) => {
      eprintln!("Error: {:?}", e);
      std::process::exit(1);
    }
  };
  if let Err(e) = run_benchmark(&args, std::io::stdout().lock()) {
    eprintln!("Error: {:?}", e);
    std::process::exit(1);
  }
}
