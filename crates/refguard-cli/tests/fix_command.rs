use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn fix_strips_broken_links_and_writes_logs() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let project = temp.path();
    write(project, "docs/x/page.md", "See [Link](../missing/file.md).\n");

    let mut cmd = cli();
    cmd.args(["fix", "--project", project.to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(contains("Broken links removed: 1"))
        .stdout(contains("x/page.md: [Link](../missing/file.md)"));

    assert_eq!(fs::read_to_string(project.join("docs/x/page.md"))?, "See Link.\n");
    let log = fs::read_to_string(project.join("_maintainers/logs/broken-links-removed.log"))?;
    assert!(log.contains("Broken Link: ../missing/file.md"));
    assert!(project.join("_maintainers/logs/link-rewrites.log").is_file());
    Ok(())
}

#[test]
fn clean_corpus_needs_no_transformations() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let project = temp.path();
    write(project, "docs/a.md", "[B](b.md)\n");
    write(project, "docs/b.md", "# B\n");

    let mut cmd = cli();
    cmd.args(["fix", "--project", project.to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(contains("No transformations needed"));
    Ok(())
}

#[test]
fn dry_run_leaves_documents_and_logs_alone() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let project = temp.path();
    write(project, "content/page.md", "[gone](nowhere.md)\n");

    let mut cmd = cli();
    cmd.args([
        "fix",
        "content",
        "--dry-run",
        "--project",
        project.to_str().unwrap(),
    ]);

    cmd.assert().success().stdout(contains("Files would change: 1"));

    assert_eq!(fs::read_to_string(project.join("content/page.md"))?, "[gone](nowhere.md)\n");
    assert!(!project.join("_maintainers/logs").exists());
    Ok(())
}

#[test]
fn json_output_carries_summary_counts() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let project = temp.path();
    write(project, "docs/page.mdx", "![Alt](../images/a/b.png)\n");

    let mut cmd = cli();
    cmd.args(["--json", "fix", "--project", project.to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(contains("\"type\":\"fix\""))
        .stdout(contains("\"images\":1"));
    assert_eq!(
        fs::read_to_string(project.join("docs/page.mdx"))?,
        "![Alt](/img/a/b.png)\n"
    );
    Ok(())
}

#[test]
fn missing_corpus_root_is_a_usage_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;

    let mut cmd = cli();
    cmd.args(["fix", "--project", temp.path().to_str().unwrap()]);

    cmd.assert()
        .failure()
        .code(64)
        .stderr(contains("corpus root not found"));
    Ok(())
}

#[test]
fn explicit_missing_config_is_a_config_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    fs::create_dir_all(temp.path().join("docs"))?;

    let mut cmd = cli();
    cmd.args([
        "fix",
        "--project",
        temp.path().to_str().unwrap(),
        "--config",
        temp.path().join("absent.yaml").to_str().unwrap(),
    ]);

    cmd.assert().failure().code(78).stderr(contains("config error"));
    Ok(())
}

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_refguard"))
}
