fn main() {
  let args: Vec<String> = std::env::args().collect();
  if args.len() != 3 {
    eprintln!("Usage: {} lineitem.tbl lineitem.dat", args[0]);
    std::process::exit(1);
  }
  match driver::load::load_lineitem(&args[1], &args[2]) {
    Ok(num_pages) => eprintln!("wrote {} pages", num_pages),
    Err(e) => {
      eprintln!("Error: {:?}", e);
      std::process::exit(1);
    }
  }
}
