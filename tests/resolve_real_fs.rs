use std::fs;

use proptest::prelude::*;
use procstream::fs::RealFileSystem;
use procstream::fs::mock::MockFileSystem;
use procstream::resolve::{Platform, ResolveEnv, Resolver};

fn env_for(cwd: &std::path::Path, path: &[&std::path::Path]) -> ResolveEnv {
    ResolveEnv::new(
        Platform::Posix,
        cwd.to_string_lossy(),
        path.iter().map(|p| p.to_string_lossy().into_owned()).collect(),
    )
}

#[test]
fn finds_executables_on_disk_in_path_order() {
    let root = tempfile::tempdir().unwrap();
    let first = root.path().join("first");
    let second = root.path().join("second");
    let cwd = root.path().join("cwd");
    for dir in [&first, &second, &cwd] {
        fs::create_dir(dir).unwrap();
    }
    fs::write(second.join("tool"), "").unwrap();
    fs::write(first.join("tool"), "").unwrap();

    let env = env_for(&cwd, &[&first, &second]);
    let resolved = Resolver::new(&RealFileSystem, &env).resolve("tool", &["-x".to_string()]);

    assert_eq!(resolved.cmd, first.join("tool").to_string_lossy());
    assert_eq!(resolved.args, vec!["-x".to_string()]);
}

#[test]
fn working_directory_wins_and_directories_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    let bin = root.path().join("bin");
    fs::create_dir(&bin).unwrap();
    fs::write(bin.join("tool"), "").unwrap();
    fs::write(root.path().join("tool"), "").unwrap();
    // A directory named like the command must not shadow the real one.
    fs::create_dir(bin.join("other")).unwrap();
    let extra = root.path().join("extra");
    fs::create_dir(&extra).unwrap();
    fs::write(extra.join("other"), "").unwrap();

    let env = env_for(root.path(), &[&bin, &extra]);
    let resolver = Resolver::new(&RealFileSystem, &env);

    assert_eq!(
        resolver.resolve("tool", &[]).cmd,
        root.path().join("tool").to_string_lossy()
    );
    assert_eq!(
        resolver.resolve("other", &[]).cmd,
        extra.join("other").to_string_lossy()
    );
}

#[test]
fn unknown_commands_pass_through() {
    let root = tempfile::tempdir().unwrap();
    let env = env_for(root.path(), &[root.path()]);
    let resolved = Resolver::new(&RealFileSystem, &env).resolve("nowhere", &[]);
    assert_eq!(resolved.cmd, "nowhere");
}

fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}",
        "[a-z]{1,8}\\.(exe|bat|cmd|ps1|js|txt)",
        "[a-z]{1,4}/[a-z]{1,4}",
    ]
}

proptest! {
    #[test]
    fn windows_resolution_is_deterministic(
        name in name_strategy(),
        present in proptest::collection::vec(name_strategy(), 0..6),
        args in proptest::collection::vec("[a-z-]{0,6}", 0..4),
    ) {
        let fs = MockFileSystem::new();
        for file in &present {
            fs.add_file(format!("C:\\tools\\{file}"));
        }
        let env = ResolveEnv::new(
            Platform::Windows,
            "C:\\work",
            vec!["C:\\tools".to_string()],
        );
        let resolver = Resolver::new(&fs, &env);

        let first = resolver.resolve(&name, &args);
        let second = resolver.resolve(&name, &args);
        prop_assert_eq!(&first, &second);

        // The caller's arguments always come last, in order.
        prop_assert!(first.args.ends_with(&args));
    }

    #[test]
    fn posix_resolution_never_rewrites_arguments(
        name in "[a-z]{1,8}",
        args in proptest::collection::vec(".{0,6}", 0..4),
    ) {
        let fs = MockFileSystem::with_files([format!("/bin/{name}")]);
        let env = ResolveEnv::new(Platform::Posix, "/work", vec!["/bin".to_string()]);
        let resolved = Resolver::new(&fs, &env).resolve(&name, &args);
        prop_assert_eq!(resolved.cmd, format!("/bin/{}", name));
        prop_assert_eq!(resolved.args, args);
    }
}
