use clap::{CommandFactory, Parser};
use nbcontents::tooling::cli::{CheckpointCommands, Cli, Commands};

#[test]
fn parse_valid_command_matrix() {
    let cases: Vec<Vec<&str>> = vec![
        vec!["nbcontents", "ls"],
        vec!["nbcontents", "ls", "/work"],
        vec!["nbcontents", "stat", "a.txt"],
        vec!["nbcontents", "cat", "--raw", "a.txt"],
        vec!["nbcontents", "put", "a.txt", "./local.txt"],
        vec!["nbcontents", "mv", "a.txt", "b.txt"],
        vec!["nbcontents", "rm", "b.txt"],
        vec!["nbcontents", "mkdir", "/", "--name", "data"],
        vec!["nbcontents", "new-notebook", "work"],
        vec!["nbcontents", "copy-notebook", "work/Untitled0.ipynb"],
        vec!["nbcontents", "checkpoint", "create", "nb.ipynb"],
        vec!["nbcontents", "checkpoint", "list", "nb.ipynb"],
        vec!["nbcontents", "checkpoint", "restore", "nb.ipynb", "0"],
        vec!["nbcontents", "checkpoint", "delete", "nb.ipynb", "0"],
        vec!["nbcontents", "validate", "nb.ipynb"],
        vec!["nbcontents", "--root", "/srv", "--log-level", "debug", "ls"],
    ];

    for args in cases {
        let parsed = Cli::try_parse_from(args.clone());
        assert!(parsed.is_ok(), "expected valid parse for args: {args:?}");
    }
}

#[test]
fn parse_rejects_missing_arguments() {
    assert!(Cli::try_parse_from(["nbcontents", "mv", "a.txt"]).is_err());
    assert!(Cli::try_parse_from(["nbcontents", "checkpoint", "restore", "nb.ipynb"]).is_err());
    assert!(Cli::try_parse_from(["nbcontents"]).is_err());
}

#[test]
fn parse_checkpoint_restore_fields() {
    let cli = Cli::try_parse_from(["nbcontents", "checkpoint", "restore", "a/nb.ipynb", "01J"])
        .unwrap();
    match cli.command {
        Commands::Checkpoint {
            command:
                CheckpointCommands::Restore {
                    path,
                    checkpoint_id,
                },
        } => {
            assert_eq!(path, "a/nb.ipynb");
            assert_eq!(checkpoint_id, "01J");
        }
        _ => panic!("expected checkpoint restore"),
    }
}

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}
