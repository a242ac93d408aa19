mod common;

use grit::{Item, Proxy};

/// §8 end-to-end scenario 6 ("proxy parity"): a `Proxy` against a real,
/// listening `grit-server` must see the same paths and bytes as the local
/// repository it mirrors, fetching item content through the `data` action.
///
/// This exercises the absolute-URL fix in `grit-server/src/rpc.rs` directly:
/// `Proxy::items`/`Proxy::data` POST straight to the `url` field the server
/// injects into each response element, so a site-relative URL there would
/// make every one of these calls fail to even parse as a request.
#[test]
fn scenario_6_proxy_parity() {
    let tmp = tempfile::tempdir().unwrap();
    let repo_root = tmp.path().join("repos");
    std::fs::create_dir_all(&repo_root).unwrap();

    let repo = common::init_repo(&repo_root.join("repo"));
    repo.set_description("hello from the proxy test").unwrap();
    let item = Item::from_string(&repo, "a.bin", b"payload".to_vec()).unwrap();
    repo.add_item(item, Some("add a")).unwrap();

    let addr = common::spawn_server(repo_root.clone(), tmp.path().join("static"));

    let proxy = Proxy::connect(&format!("http://{}/repo", addr)).expect("proxy handshake");
    assert_eq!(proxy.description().as_deref(), Some("hello from the proxy test"));

    let proxy_items = proxy.items(None, None).expect("proxy items");
    assert_eq!(proxy_items.len(), 1);
    assert_eq!(proxy_items[0].data().expect("proxy item data"), b"payload");

    // The same paths/bytes the local repository itself reports.
    let local_items = repo.items(None, None).unwrap();
    assert_eq!(local_items.len(), proxy_items.len());
    assert_eq!(local_items[0].data().unwrap(), proxy_items[0].data().unwrap());
}

#[test]
fn scenario_6_proxy_branch_inherits_over_http() {
    let tmp = tempfile::tempdir().unwrap();
    let repo_root = tmp.path().join("repos");
    std::fs::create_dir_all(&repo_root).unwrap();

    let repo = common::init_repo(&repo_root.join("base"));
    let item = Item::from_string(&repo, "a.bin", b"base".to_vec()).unwrap();
    repo.add_item(item, Some("add a")).unwrap();
    repo.branch("child", None).unwrap();

    let addr = common::spawn_server(repo_root.clone(), tmp.path().join("static"));

    let proxy = Proxy::connect(&format!("http://{}/base/child", addr)).expect("proxy handshake");
    let inherited = proxy.items(None, None).expect("proxy items");
    assert_eq!(inherited.len(), 1);
    assert_eq!(inherited[0].data().expect("inherited item data"), b"base");

    let parent = proxy.parent().expect("proxy parent").expect("child has a parent");
    assert_eq!(parent.name().as_deref(), Some("base"));
}
