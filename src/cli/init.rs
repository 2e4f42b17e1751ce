use crate::error::Result;
use crate::settings::Settings;

pub fn run(
    rules: Option<String>,
    lookup: Option<String>,
    checks: Option<String>,
    output_dir: Option<String>,
) -> Result<()> {
    let mut settings = Settings::load();
    settings.update(rules, lookup, checks, output_dir);
    let path = settings.save()?;

    let show = |v: &Option<String>| v.as_deref().unwrap_or("(not set)").to_string();
    println!("Rules:       {}", show(&settings.rules_file));
    println!("Lookup:      {}", show(&settings.lookup_file));
    println!("Checks:      {}", show(&settings.checks_file));
    println!("Output dir:  {}", show(&settings.output_dir));
    println!("Saved to {}", path.display());
    Ok(())
}
