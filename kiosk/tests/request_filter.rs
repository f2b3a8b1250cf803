use std::fs;

use kiosk::filter::{BlockFilterList, RequestVerdict};
use kiosk::shell::Shell;

mod support;

use support::test_config;

#[test]
fn loads_patterns_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocklist.txt");
    fs::write(
        &path,
        "# trackers\n\n*://*.doubleclick.net/*\nhttps://ads.example.com/\n",
    )
    .unwrap();

    let list = BlockFilterList::load(&path);
    assert_eq!(list.len(), 2);

    let shell = Shell::new(test_config(), list);
    assert_eq!(
        shell.check_request("https://ads.example.com/banner.png"),
        RequestVerdict::Cancel
    );
    assert_eq!(
        shell.check_request("https://static.doubleclick.net/x.js"),
        RequestVerdict::Cancel
    );
    assert_eq!(
        shell.check_request("https://play.soulbound.game/"),
        RequestVerdict::Allow
    );
}

#[test]
fn missing_file_disables_filtering() {
    let dir = tempfile::tempdir().unwrap();
    let list = BlockFilterList::load(&dir.path().join("missing.txt"));

    assert!(list.is_empty());
    let shell = Shell::new(test_config(), list);
    assert_eq!(
        shell.check_request("https://ads.example.com/"),
        RequestVerdict::Allow
    );
}

#[test]
fn shared_filter_answers_like_the_shell() {
    let shell = Shell::new(
        test_config(),
        BlockFilterList::parse("evil.example"),
    );
    let filter = shell.filter();

    for url in ["https://evil.example/a", "https://good.example/"] {
        assert_eq!(filter.check(url), shell.check_request(url));
    }
}
