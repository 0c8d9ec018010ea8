//! Command routing through the `envkeep` CLI library.

use clap::Parser;
use envkeep_cli::{run, Cli, Commands};
use envkeep_integration_tests::Workspace;

fn cli(ws: &Workspace, project: &str, args: &[&str]) -> Cli {
    let config = ws.write_config(project);
    let mut argv = vec![
        "envkeep".to_string(),
        "-c".to_string(),
        config.to_string_lossy().into_owned(),
    ];
    argv.extend(args.iter().map(|a| a.to_string()));
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn test_unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["envkeep", "nonexistent-command"]).is_err());
}

#[test]
fn test_every_command_routes() {
    let cases: &[&[&str]] = &[
        &["envkeep", "set", "K", "V"],
        &["envkeep", "mv", "A", "B"],
        &["envkeep", "rm", "K"],
        &["envkeep", "grep", "K"],
        &["envkeep", "history", "K", "-a"],
        &["envkeep", "cat"],
        &["envkeep", "dump", "-o", "out.env"],
        &["envkeep", "import", "in.env"],
        &["envkeep", "rotate", "-e", "00"],
        &["envkeep", "prune", "2"],
        &["envkeep", "stat"],
        &["envkeep", "info"],
        &["envkeep", "version"],
    ];
    for argv in cases {
        assert!(Cli::try_parse_from(*argv).is_ok(), "failed to parse {argv:?}");
    }
}

#[tokio::test]
async fn test_set_and_rm_through_cli() {
    let ws = Workspace::new();

    run(cli(&ws, "test", &["set", "SHARED", "global", "-g"])).await.unwrap();
    run(cli(&ws, "test", &["set", "SHARED", "local"])).await.unwrap();
    assert_eq!(ws.lookup("test", "SHARED").await.as_deref(), Some("local"));
    assert_eq!(ws.lookup("other", "SHARED").await.as_deref(), Some("global"));

    run(cli(&ws, "test", &["rm", "SHARED"])).await.unwrap();
    assert_eq!(ws.lookup("test", "SHARED").await.as_deref(), Some("global"));
}

#[tokio::test]
async fn test_dump_through_cli() {
    let ws = Workspace::new();
    run(cli(&ws, "test", &["set", "A", "1"])).await.unwrap();

    let path = ws.dir.path().join("out.env");
    let path_arg = path.to_string_lossy().into_owned();
    run(cli(&ws, "test", &["dump", "-o", &path_arg])).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "A=1\n");
}

#[tokio::test]
async fn test_missing_key_fails_before_touching_store() {
    let ws = Workspace::new();
    let path = ws.dir.path().join("nokey.json5");
    std::fs::write(&path, r#"{ project: "test" }"#).unwrap();
    let db = ws.database();
    let db_arg = db.to_string_lossy().into_owned();
    let path_arg = path.to_string_lossy().into_owned();

    let parsed = Cli::try_parse_from(["envkeep", "-c", &path_arg, "--db", &db_arg, "cat"]).unwrap();
    assert!(matches!(parsed.command, Commands::Cat));
    assert!(run(parsed).await.is_err());
    assert!(!db.exists());
}
