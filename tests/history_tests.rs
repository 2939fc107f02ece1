use git_rewind::cursor::{Cursor, Navigation};
use git_rewind::git::{GitCli, GitError, History};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Run git in `dir` with a fixed identity, returning trimmed stdout.
fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=Test Author",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn commit_file(dir: &Path, name: &str, content: &str, message: &str) -> String {
    fs::write(dir.join(name), content).unwrap();
    git(dir, &["add", name]);
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

fn commit_bytes(dir: &Path, name: &str, content: &[u8], message: &str) -> String {
    fs::write(dir.join(name), content).unwrap();
    git(dir, &["add", name]);
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Repository with `notes.txt` committed three times:
/// r1 writes a/b/c, r2 rewrites b, r3 appends d.
struct Fixture {
    dir: TempDir,
    revs: [String; 3],
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "-q"]);
        let r1 = commit_file(dir.path(), "notes.txt", "a\nb\nc\n", "first");
        let r2 = commit_file(dir.path(), "notes.txt", "a\nB\nc\n", "second");
        let r3 = commit_file(dir.path(), "notes.txt", "a\nB\nc\nd\n", "third");
        Self {
            dir,
            revs: [r1, r2, r3],
        }
    }

    fn file(&self) -> PathBuf {
        self.dir.path().join("notes.txt")
    }
}

fn texts(cursor: &Cursor<GitCli>) -> Vec<String> {
    cursor.lines().iter().map(|l| l.text.clone()).collect()
}

#[test]
fn revisions_are_oldest_first() {
    let fx = Fixture::new();
    let git = GitCli::new("HEAD").unwrap();
    let revs = git.revisions(&fx.file()).unwrap();
    assert_eq!(revs, fx.revs.to_vec());
}

#[test]
fn revisions_only_include_commits_touching_file() {
    let fx = Fixture::new();
    commit_file(fx.dir.path(), "other.txt", "x\n", "unrelated");
    let git = GitCli::new("HEAD").unwrap();
    assert_eq!(git.revisions(&fx.file()).unwrap().len(), 3);
}

#[test]
fn untracked_file_is_not_tracked() {
    let fx = Fixture::new();
    let path = fx.dir.path().join("scratch.txt");
    fs::write(&path, "new\n").unwrap();
    let git = GitCli::new("HEAD").unwrap();
    assert!(matches!(
        git.revisions(&path),
        Err(GitError::PathNotTracked(_))
    ));
}

#[test]
fn missing_directory_is_not_tracked() {
    let fx = Fixture::new();
    let path = fx.dir.path().join("nope").join("file.txt");
    let git = GitCli::new("HEAD").unwrap();
    assert!(matches!(
        git.revisions(&path),
        Err(GitError::PathNotTracked(_))
    ));
}

#[test]
fn outside_repository_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loose.txt");
    fs::write(&path, "x\n").unwrap();
    let git = GitCli::new("HEAD").unwrap();
    // Temp dirs may sit inside some other checkout; either way it is an error
    assert!(git.revisions(&path).is_err());
}

#[test]
fn blame_attributes_each_line() {
    let fx = Fixture::new();
    let git = GitCli::new("HEAD").unwrap();
    let lines = git.blame(&fx.file(), &fx.revs[2]).unwrap();

    let owners: Vec<&str> = lines.iter().map(|l| l.revision.as_str()).collect();
    assert_eq!(
        owners,
        vec![
            fx.revs[0].as_str(),
            fx.revs[1].as_str(),
            fx.revs[0].as_str(),
            fx.revs[2].as_str()
        ]
    );
    assert_eq!(lines[3].text, "d");
    assert_eq!(lines[3].line_number, 4);
    assert_eq!(lines[3].author, "Test Author");
    assert_eq!(lines[3].summary, "third");
    assert!(lines[0].author_time.is_some());
}

#[test]
fn blame_keeps_lines_that_are_not_utf8() {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q"]);
    let rev = commit_bytes(dir.path(), "latin1.txt", b"ok\ncaf\xe9\nend\n", "latin-1");
    let path = dir.path().join("latin1.txt");

    let git = GitCli::new("HEAD").unwrap();
    let lines = git.blame(&path, &rev).unwrap();
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["ok", "caf\u{FFFD}", "end"]);

    let mut cursor = Cursor::new(git);
    cursor.load_file(&path).unwrap();
    assert_eq!(cursor.lines().len(), 3);
}

#[test]
fn describe_tolerates_non_utf8_message() {
    let dir = tempfile::tempdir().unwrap();
    let msg_dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q"]);
    fs::write(dir.path().join("a.txt"), "a\n").unwrap();
    git(dir.path(), &["add", "a.txt"]);

    let message = msg_dir.path().join("message");
    fs::write(&message, b"r\xe9sum\xe9 update\n").unwrap();
    git(dir.path(), &["commit", "-q", "-F", message.to_str().unwrap()]);
    let rev = git(dir.path(), &["rev-parse", "HEAD"]);

    let git = GitCli::new("HEAD").unwrap();
    let text = git.describe(&dir.path().join("a.txt"), &rev).unwrap();
    assert!(text.starts_with(&format!("commit {}", rev)));
    assert!(text.contains("sum"));
    assert!(text.contains("update"));
}

#[test]
fn sha256_repository_can_be_blamed() {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q", "--object-format=sha256"]);
    let r1 = commit_file(dir.path(), "f.txt", "one\n", "first");
    let r2 = commit_file(dir.path(), "f.txt", "one\ntwo\n", "second");
    assert_eq!(r1.len(), 64);
    let path = dir.path().join("f.txt");

    let git = GitCli::new("HEAD").unwrap();
    assert_eq!(git.revisions(&path).unwrap(), vec![r1.clone(), r2.clone()]);

    let lines = git.blame(&path, &r2).unwrap();
    let owners: Vec<&str> = lines.iter().map(|l| l.revision.as_str()).collect();
    assert_eq!(owners, vec![r1.as_str(), r2.as_str()]);

    let mut cursor = Cursor::new(git);
    cursor.load_file(&path).unwrap();
    assert_eq!(cursor.first_changed_line(), Some(1));
}

#[test]
fn blame_at_older_revision() {
    let fx = Fixture::new();
    let git = GitCli::new("HEAD").unwrap();
    let lines = git.blame(&fx.file(), &fx.revs[0]).unwrap();
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
    assert!(lines.iter().all(|l| l.revision == fx.revs[0]));
}

#[test]
fn describe_returns_commit_message() {
    let fx = Fixture::new();
    let git = GitCli::new("HEAD").unwrap();
    let text = git.describe(&fx.file(), &fx.revs[1]).unwrap();
    assert!(text.starts_with(&format!("commit {}", fx.revs[1])));
    assert!(text.contains("Test Author"));
    assert!(text.contains("second"));
}

#[test]
fn unknown_branch_fails() {
    let fx = Fixture::new();
    let git = GitCli::new("no-such-branch").unwrap();
    assert!(git.revisions(&fx.file()).is_err());
}

#[test]
fn branch_limits_history() {
    let fx = Fixture::new();
    git(fx.dir.path(), &["branch", "old", &fx.revs[1]]);
    let git = GitCli::new("old").unwrap();
    let revs = git.revisions(&fx.file()).unwrap();
    assert_eq!(revs, fx.revs[..2].to_vec());
}

#[test]
fn cursor_scenario_against_git() {
    let fx = Fixture::new();
    let mut cursor = Cursor::new(GitCli::new("HEAD").unwrap());
    cursor.load_file(&fx.file()).unwrap();

    assert_eq!(cursor.revisions().len(), 3);
    assert_eq!(cursor.current_index(), Some(2));
    assert_eq!(texts(&cursor), vec!["a", "B", "c", "d"]);
    assert_eq!(cursor.first_changed_line(), Some(3));
    assert!(cursor.description().contains("third"));

    // The line added by the newest revision: show the version before it
    assert_eq!(cursor.invoke_line_action(3).unwrap(), Navigation::Moved);
    assert_eq!(cursor.current_index(), Some(1));
    assert_eq!(texts(&cursor), vec!["a", "B", "c"]);
    assert_eq!(cursor.first_changed_line(), Some(1));

    // A line from the first revision: jump to it
    assert_eq!(cursor.invoke_line_action(0).unwrap(), Navigation::Moved);
    assert_eq!(cursor.current_index(), Some(0));
    assert_eq!(texts(&cursor), vec!["a", "b", "c"]);
    assert_eq!(cursor.first_changed_line(), Some(0));
    assert!(cursor.description().contains("first"));

    // Nothing older than the first revision
    assert_eq!(cursor.invoke_line_action(0).unwrap(), Navigation::Unchanged);
}

#[test]
fn cursor_prefix_navigation_against_git() {
    let fx = Fixture::new();
    let mut cursor = Cursor::new(GitCli::new("HEAD").unwrap());
    cursor.load_file(&fx.file()).unwrap();

    let prefix = &fx.revs[1][..10];
    assert_eq!(cursor.go_to_revision_prefix(prefix).unwrap(), Navigation::Moved);
    assert_eq!(cursor.current_index(), Some(1));
    assert_eq!(
        cursor.go_to_revision_prefix("ffffffffffff").unwrap_or(Navigation::Moved),
        Navigation::NotFound
    );
}

#[test]
fn cursor_on_untracked_file_is_empty() {
    let fx = Fixture::new();
    let path = fx.dir.path().join("fresh.txt");
    fs::write(&path, "hello\n").unwrap();

    let mut cursor = Cursor::new(GitCli::new("HEAD").unwrap());
    assert!(cursor.load_file(&path).is_err());
    assert_eq!(cursor.current_index(), None);
    assert!(cursor.lines().is_empty());
}
