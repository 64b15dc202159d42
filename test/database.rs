// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{install, write_fixture};

use anyhow::Result;
use indoc::indoc;
use pretty_assertions::assert_eq;
use profiles::{
    default_merge_policies, merge_env_from_profiles, DatabaseError, EnvVars, OsFileSystem,
    ProfileDatabase, SchemaVersion, Target,
};
use sealed_test::prelude::*;
use std::{fs, path::Path};

fn target_names(db: &ProfileDatabase, installer: &str, name: &str) -> Vec<String> {
    db.lookup_profile(installer, name)
        .map(|profile| profile.targets().iter().map(ToString::to_string).collect())
        .unwrap_or_default()
}

#[sealed_test]
fn write_then_read_single_file() -> Result<()> {
    let db = ProfileDatabase::new();
    install(&db, "", "go", "amd64-linux@1.6", &["GOROOT=/opt/go"])?;
    install(&db, "", "go", "arm-android@1.5", &[])?;
    install(&db, "", "go", "amd64-linux@1.5", &[])?;
    db.write(&OsFileSystem, "", "profiles.xml")?;

    let reread = ProfileDatabase::new();
    reread.read(&OsFileSystem, "profiles.xml")?;
    assert_eq!(reread.schema_version(), SchemaVersion::V5);
    assert_eq!(reread.names(), vec!["go"]);
    assert_eq!(
        target_names(&reread, "", "go"),
        vec!["amd64-linux@1.6", "amd64-linux@1.5", "arm-android@1.5"]
    );

    let installed = reread
        .lookup_profile_target("", "go", &"amd64-linux@1.6".parse()?)
        .ok_or_else(|| anyhow::anyhow!("missing target"))?;
    assert_eq!(installed.env, vec!["GOROOT=/opt/go"]);
    assert!(installed.update_time.is_some());

    Ok(())
}

#[sealed_test]
fn write_then_read_keeps_whitespace_of_env() -> Result<()> {
    let env = ["FOO=bar ", "  LEAD=x", "QUOTED=\"a & b\""];
    let db = ProfileDatabase::new();
    install(&db, "", "go", "amd64-linux@1.6", &env)?;
    db.write(&OsFileSystem, "", "p.xml")?;

    let reread = ProfileDatabase::new();
    reread.read(&OsFileSystem, "p.xml")?;
    assert_eq!(
        reread.target_env("", "go", &"amd64-linux".parse()?),
        Some(env.iter().map(|var| var.to_string()).collect::<Vec<_>>())
    );

    Ok(())
}

#[sealed_test]
fn write_keeps_previous_file_as_backup() -> Result<()> {
    let db = ProfileDatabase::new();
    install(&db, "", "go", "amd64-linux@1.6", &[])?;
    db.write(&OsFileSystem, "", "profiles.xml")?;
    assert!(!Path::new("profiles.xml.prev").exists());

    install(&db, "", "nacl", "amd64-nacl@2", &[])?;
    db.write(&OsFileSystem, "", "profiles.xml")?;

    let backup = ProfileDatabase::new();
    backup.read(&OsFileSystem, "profiles.xml.prev")?;
    assert_eq!(backup.names(), vec!["go"]);

    let current = ProfileDatabase::new();
    current.read(&OsFileSystem, "profiles.xml")?;
    assert_eq!(current.names(), vec!["go", "nacl"]);

    Ok(())
}

#[sealed_test]
fn write_refuses_target_without_version() -> Result<()> {
    let db = ProfileDatabase::new();
    db.install_profile("", "go", "go");
    db.add_profile_target("", "go", Target::new("amd64", "linux"))?;

    let result = db.write(&OsFileSystem, "", "profiles.xml");
    assert!(matches!(result, Err(DatabaseError::MissingTargetVersion { .. })));
    assert_eq!(fs::read_dir(".")?.count(), 0);

    Ok(())
}

#[sealed_test]
fn write_into_directory_per_installer() -> Result<()> {
    fs::create_dir("db")?;
    let db = ProfileDatabase::new();
    install(&db, "v23", "go", "amd64-linux@1.6", &[])?;
    install(&db, "fuchsia", "clang", "arm64-fuchsia@3", &[])?;

    db.write(&OsFileSystem, "v23", "db")?;
    db.write(&OsFileSystem, "fuchsia", "db")?;
    let result = db.write(&OsFileSystem, "", "db");
    assert!(matches!(result, Err(DatabaseError::MissingInstaller { .. })));

    assert!(Path::new("db/v23").is_file());
    assert!(Path::new("db/fuchsia").is_file());

    let reread = ProfileDatabase::new();
    reread.read(&OsFileSystem, "db")?;
    assert_eq!(reread.names(), vec!["fuchsia:clang", "v23:go"]);
    assert_eq!(reread.schema_version(), SchemaVersion::V5);

    Ok(())
}

#[sealed_test]
fn read_missing_path_yields_empty_database() -> Result<()> {
    let db = ProfileDatabase::new();
    install(&db, "", "go", "amd64-linux@1.6", &[])?;

    db.read(&OsFileSystem, "nowhere.xml")?;
    assert_eq!(db.names(), Vec::<String>::new());
    assert_eq!(db.schema_version(), SchemaVersion::Original);

    Ok(())
}

#[sealed_test]
fn read_directory_rejects_mixed_versions() -> Result<()> {
    write_fixture(
        "db/a",
        r#"<profiles version="5" installer="a"><profile name="go" root="go"><target arch="amd64" os="linux" version="1"></target></profile></profiles>"#,
    )?;
    write_fixture(
        "db/b",
        r#"<profiles version="4"><profile name="b:go" root="go"><target arch="amd64" os="linux" version="1"></target></profile></profiles>"#,
    )?;

    let db = ProfileDatabase::new();
    let result = db.read(&OsFileSystem, "db");
    match result {
        Err(DatabaseError::DirectoryVersionMismatch {
            version, expected, ..
        }) => {
            assert_eq!(version, SchemaVersion::V4);
            assert_eq!(expected, SchemaVersion::V5);
        }
        other => panic!("unexpected result {other:?}"),
    }

    Ok(())
}

#[sealed_test]
fn read_directory_rejects_old_schema() -> Result<()> {
    write_fixture(
        "db/a",
        indoc! {r#"
            <profiles version="3">
              <profile name="a:go" root="go">
                <target arch="amd64" os="linux" version="1"></target>
              </profile>
            </profiles>
        "#},
    )?;

    let db = ProfileDatabase::new();
    install(&db, "", "keep", "amd64-linux@1", &[])?;
    let result = db.read(&OsFileSystem, "db");
    assert!(matches!(
        result,
        Err(DatabaseError::DirectoryVersionTooOld {
            version: SchemaVersion::V3,
            minimum: SchemaVersion::V5,
            ..
        })
    ));
    assert_eq!(db.names(), vec!["keep"]);

    Ok(())
}

#[sealed_test]
fn read_directory_skips_backups() -> Result<()> {
    write_fixture(
        "db/a",
        r#"<profiles version="5" installer="a"><profile name="go" root="go"><target arch="amd64" os="linux" version="1"></target></profile></profiles>"#,
    )?;
    write_fixture("db/a.prev", "not even xml")?;

    let db = ProfileDatabase::new();
    db.read(&OsFileSystem, "db")?;
    assert_eq!(db.names(), vec!["a:go"]);

    Ok(())
}

#[sealed_test]
fn read_legacy_file_then_write_latest() -> Result<()> {
    write_fixture(
        "profiles.xml",
        indoc! {r#"
            <profiles>
              <profile name="go" root="go">
                <target tag="native" arch="amd64" os="linux" version="1.5">
                  <envvars><var>GOARCH=amd64</var></envvars>
                </target>
              </profile>
            </profiles>
        "#},
    )?;

    let db = ProfileDatabase::new();
    db.read(&OsFileSystem, "profiles.xml")?;
    assert_eq!(db.schema_version(), SchemaVersion::Original);
    db.write(&OsFileSystem, "", "profiles.xml")?;

    let data = fs::read_to_string("profiles.xml")?;
    assert!(data.starts_with(r#"<profiles version="5""#));
    assert!(!data.contains("tag="));

    let reread = ProfileDatabase::new();
    reread.read(&OsFileSystem, "profiles.xml")?;
    assert_eq!(reread.schema_version(), SchemaVersion::V5);
    assert_eq!(target_names(&reread, "", "go"), vec!["amd64-linux@1.5"]);

    Ok(())
}

#[sealed_test]
fn merge_environment_of_persisted_profiles() -> Result<()> {
    let db = ProfileDatabase::new();
    install(
        &db,
        "",
        "go",
        "amd64-linux@1.6",
        &["PATH=/opt/go/bin", "CGO_CFLAGS=-I/opt/go", "GOROOT=/opt/go"],
    )?;
    install(
        &db,
        "",
        "nacl",
        "amd64-linux@2",
        &["PATH=/opt/nacl/bin", "CGO_CFLAGS=-I/opt/nacl", "GOROOT=/opt/nacl"],
    )?;
    db.write(&OsFileSystem, "", "profiles.xml")?;

    let reread = ProfileDatabase::new();
    reread.read(&OsFileSystem, "profiles.xml")?;

    let mut env = EnvVars::from_vars(["PATH=/usr/bin", "HOME=/home/blah"]);
    merge_env_from_profiles(
        &default_merge_policies(),
        &mut env,
        &reread,
        ["go", "nacl", "missing"],
        &"amd64-linux".parse()?,
    );

    assert_eq!(env.get("PATH"), Some("/opt/nacl/bin:/opt/go/bin:/usr/bin"));
    assert_eq!(env.get("CGO_CFLAGS"), Some("-I/opt/go -I/opt/nacl"));
    assert_eq!(env.get("GOROOT"), Some("/opt/go"));
    assert_eq!(env.get("HOME"), Some("/home/blah"));

    Ok(())
}
