use clap::Parser;
use hearth_import::LogicalField;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "hearth-import",
    version,
    about = "Map, review and commit a bank CSV export as household transactions."
)]
pub struct Args {
    /// CSV export with a header row
    pub file: PathBuf,

    /// Settings file
    #[arg(short, long, default_value = "hearth.toml")]
    pub config: PathBuf,

    /// Override one column mapping, e.g. `--map amountSecondary=Debit`
    #[arg(long = "map", value_name = "FIELD=COLUMN", value_parser = parse_mapping_arg)]
    pub mappings: Vec<(LogicalField, String)>,

    /// Tag a row (1-based) with a member name or id, e.g. `--member 3=Alex`
    #[arg(long = "member", value_name = "ROW=MEMBER", value_parser = parse_member_arg)]
    pub members: Vec<(usize, String)>,

    /// Tag every row not tagged by `--member`
    #[arg(long, value_name = "MEMBER")]
    pub member_all: Option<String>,

    /// Let the server parse and type-match the file instead of doing it locally
    #[arg(long)]
    pub server_parse: bool,

    /// Create an account with this username (plus `HEARTH_EMAIL` /
    /// `HEARTH_PASSWORD`) instead of logging in
    #[arg(long, value_name = "USERNAME")]
    pub register: Option<String>,

    /// Number of preview rows (overrides settings)
    #[arg(long)]
    pub preview: Option<usize>,

    /// Print the assembled batch as JSON
    #[arg(long)]
    pub json: bool,

    /// Commit the batch to the server
    #[arg(long)]
    pub submit: bool,
}

pub fn parse_mapping_arg(s: &str) -> Result<(LogicalField, String), String> {
    let (field, column) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=COLUMN, got '{s}'"))?;
    Ok((field.trim().parse()?, column.trim().to_string()))
}

pub fn parse_member_arg(s: &str) -> Result<(usize, String), String> {
    let (row, member) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROW=MEMBER, got '{s}'"))?;
    let row: usize = row
        .trim()
        .parse()
        .map_err(|_| format!("invalid row number '{row}'"))?;
    if row == 0 {
        return Err("row numbers start at 1".to_string());
    }
    let member = member.trim();
    if member.is_empty() {
        return Err("member must not be empty".to_string());
    }
    Ok((row, member.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_arg() {
        assert_eq!(
            parse_mapping_arg("amountSecondary=Debit"),
            Ok((LogicalField::AmountSecondary, "Debit".to_string()))
        );
        // Clearing a mapping is allowed.
        assert_eq!(
            parse_mapping_arg("category="),
            Ok((LogicalField::Category, String::new()))
        );
        assert!(parse_mapping_arg("Debit").is_err());
        assert!(parse_mapping_arg("memo=Notes").is_err());
    }

    #[test]
    fn member_arg() {
        assert_eq!(parse_member_arg("3=Alex"), Ok((3, "Alex".to_string())));
        assert!(parse_member_arg("0=Alex").is_err());
        assert!(parse_member_arg("x=Alex").is_err());
        assert!(parse_member_arg("2=").is_err());
    }

    #[test]
    fn parses_full_command_line() {
        let args = Args::try_parse_from([
            "hearth-import",
            "statement.csv",
            "--map",
            "date=Posted",
            "--member",
            "1=Alex",
            "--member-all",
            "Sam",
            "--submit",
        ])
        .unwrap();
        assert_eq!(args.file, PathBuf::from("statement.csv"));
        assert_eq!(args.config, PathBuf::from("hearth.toml"));
        assert_eq!(args.mappings, vec![(LogicalField::Date, "Posted".to_string())]);
        assert_eq!(args.members, vec![(1, "Alex".to_string())]);
        assert_eq!(args.member_all.as_deref(), Some("Sam"));
        assert!(args.submit);
        assert!(!args.json);
        assert!(args.register.is_none());
    }

    #[test]
    fn parses_register() {
        let args =
            Args::try_parse_from(["hearth-import", "statement.csv", "--register", "alex", "--submit"])
                .unwrap();
        assert_eq!(args.register.as_deref(), Some("alex"));
    }
}
