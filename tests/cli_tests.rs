use clap::Parser;
use trailhead::cli::{Cli, Commands};

#[test]
fn test_routes_command_parses() {
    let cli = Cli::try_parse_from(["trailhead-gen", "routes", "--root", "./routes"])
        .expect("parse");
    match cli.command {
        Commands::Routes { root, base_path } => {
            assert_eq!(root.to_str(), Some("./routes"));
            assert!(base_path.is_empty());
        }
        _ => panic!("expected routes command"),
    }
}

#[test]
fn test_openapi_command_parses_with_output() {
    let cli = Cli::try_parse_from([
        "trailhead-gen",
        "openapi",
        "--root",
        "./routes",
        "--title",
        "Demo API",
        "--out",
        "openapi.json",
    ])
    .expect("parse");
    match cli.command {
        Commands::Openapi { title, out, .. } => {
            assert_eq!(title, "Demo API");
            assert_eq!(out.as_deref().and_then(|p| p.to_str()), Some("openapi.json"));
        }
        _ => panic!("expected openapi command"),
    }
}

#[test]
fn test_check_command_defaults_to_get() {
    let cli = Cli::try_parse_from([
        "trailhead-gen",
        "check",
        "--root",
        "./routes",
        "--path",
        "/api/users/42",
    ])
    .expect("parse");
    match cli.command {
        Commands::Check { method, path, .. } => {
            assert_eq!(method, "GET");
            assert_eq!(path, "/api/users/42");
        }
        _ => panic!("expected check command"),
    }
}

#[test]
fn test_missing_required_args_fail() {
    assert!(Cli::try_parse_from(["trailhead-gen", "routes"]).is_err());
    assert!(Cli::try_parse_from(["trailhead-gen", "bogus"]).is_err());
}
