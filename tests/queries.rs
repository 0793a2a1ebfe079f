#![allow(missing_docs)]

use arbor::{
    MemoryStore, NestedSet, NodeRef, Record, SqliteOptions, SqliteStore, TreeNode, TreeOptions,
    TreeStore,
};

// root
// ├── books
// │   ├── fiction
// │   │   └── fantasy
// │   └── poetry
// ├── music
// └── films
struct Catalog<S: TreeStore<Node = Record>> {
    tree: NestedSet<S>,
    root: Record,
    books: Record,
    fiction: Record,
    fantasy: Record,
    poetry: Record,
    music: Record,
    films: Record,
}

fn catalog<S: TreeStore<Node = Record>>(store: S, options: TreeOptions) -> Catalog<S> {
    let mut tree = NestedSet::new(store, options);
    let mut root = Record::new("root");
    tree.make_root(&mut root, None).unwrap();

    let add = |tree: &mut NestedSet<S>, parent: &Record, name: &str| {
        let mut node = Record::new(name);
        tree.add_child(parent, &mut node).unwrap();
        node
    };
    let books = add(&mut tree, &root, "books");
    let fiction = add(&mut tree, &books, "fiction");
    let fantasy = add(&mut tree, &fiction, "fantasy");
    let poetry = add(&mut tree, &books, "poetry");
    let music = add(&mut tree, &root, "music");
    let films = add(&mut tree, &root, "films");

    let fresh = |tree: &NestedSet<S>, node: &Record| tree.get(node.id().unwrap()).unwrap().unwrap();
    Catalog {
        root: fresh(&tree, &root),
        books: fresh(&tree, &books),
        fiction: fresh(&tree, &fiction),
        fantasy: fresh(&tree, &fantasy),
        poetry: fresh(&tree, &poetry),
        music: fresh(&tree, &music),
        films: fresh(&tree, &films),
        tree,
    }
}

fn names(nodes: Vec<Record>) -> Vec<String> {
    nodes.into_iter().map(|n| n.name).collect()
}

fn name(node: Option<Record>) -> Option<String> {
    node.map(|n| n.name)
}

fn check_queries<S: TreeStore<Node = Record>>(c: Catalog<S>) {
    let t = &c.tree;

    assert_eq!(name(t.parent(&c.fantasy).unwrap()).as_deref(), Some("fiction"));
    assert_eq!(name(t.parent(&c.root).unwrap()), None);
    assert!(t.has_parent(&c.music));
    assert!(!t.has_parent(&c.root));

    assert_eq!(names(t.ancestors(&c.fantasy, None).unwrap()), ["root", "books", "fiction"]);
    assert_eq!(names(t.ancestors(&c.fantasy, Some(2)).unwrap()), ["books", "fiction"]);

    assert_eq!(
        names(t.descendants(&c.root, None, false).unwrap()),
        ["books", "fiction", "fantasy", "poetry", "music", "films"]
    );
    assert_eq!(
        names(t.descendants(&c.books, Some(1), true).unwrap()),
        ["books", "fiction", "poetry"]
    );
    assert_eq!(names(t.children(&c.root).unwrap()), ["books", "music", "films"]);
    assert_eq!(t.child_count(&c.books).unwrap(), 2);
    assert_eq!(t.descendant_count(&c.books), 3);
    assert_eq!(t.descendant_count(&c.films), 0);

    assert_eq!(name(t.first_child(&c.root).unwrap()).as_deref(), Some("books"));
    assert_eq!(name(t.last_child(&c.root).unwrap()).as_deref(), Some("films"));
    assert_eq!(name(t.first_child(&c.poetry).unwrap()), None);

    assert_eq!(name(t.prev_sibling(&c.music).unwrap()).as_deref(), Some("books"));
    assert_eq!(name(t.next_sibling(&c.music).unwrap()).as_deref(), Some("films"));
    assert!(!t.has_prev_sibling(&c.books).unwrap());
    assert!(!t.has_next_sibling(&c.films).unwrap());
    assert!(t.has_next_sibling(&c.fiction).unwrap());

    assert_eq!(names(t.siblings(&c.music, false).unwrap()), ["books", "films"]);
    assert_eq!(names(t.siblings(&c.poetry, true).unwrap()), ["fiction", "poetry"]);

    assert_eq!(names(t.path(&c.fantasy, true, false).unwrap()), ["root", "books", "fiction"]);
    assert_eq!(names(t.path(&c.fantasy, false, true).unwrap()), ["books", "fiction", "fantasy"]);
    assert_eq!(names(t.path(&c.root, true, true).unwrap()), ["root"]);

    assert_eq!(names(t.roots().unwrap()), ["root"]);
    assert_eq!(t.tree(c.root.bounds().scope).unwrap().len(), 7);
}

#[test]
fn queries_over_memory_store() {
    check_queries(catalog(MemoryStore::new(), TreeOptions::default()));
}

#[test]
fn queries_over_sqlite_store() {
    let store = SqliteStore::open_in_memory(SqliteOptions::default()).unwrap();
    check_queries(catalog(store, TreeOptions::default()));
}

#[test]
fn queries_without_scoping() {
    check_queries(catalog(MemoryStore::new(), TreeOptions::unscoped()));
}

#[test]
fn stale_subjects_answer_from_their_own_bounds() {
    let mut c = catalog(MemoryStore::new(), TreeOptions::default());
    let stale_music = c.music.clone();
    let mut extra = Record::new("extra");
    c.tree
        .insert_as_first_child_of(&mut extra, NodeRef::Id(c.root.id().unwrap()))
        .unwrap();

    // every boundary right of the root's left moved by two
    assert_eq!(name(c.tree.next_sibling(&stale_music).unwrap()).as_deref(), Some("music"));
    let music = c.tree.get(c.music.id().unwrap()).unwrap().unwrap();
    assert_eq!(name(c.tree.next_sibling(&music).unwrap()).as_deref(), Some("films"));
}

#[test]
fn forest_roots_scopes_and_trees() {
    let mut c = catalog(MemoryStore::new(), TreeOptions::default());
    let mut other = Record::new("other");
    c.tree.make_root(&mut other, None).unwrap();
    c.tree.make_root(&mut c.books, None).unwrap();

    assert_eq!(c.tree.scopes().unwrap(), vec![1, 2, 3]);
    assert_eq!(names(c.tree.roots().unwrap()), ["root", "other", "books"]);
    assert_eq!(
        names(c.tree.tree(3).unwrap()),
        ["books", "fiction", "fantasy", "poetry"]
    );
    assert_eq!(names(c.tree.tree(1).unwrap()), ["root", "music", "films"]);
    let fantasy = c.tree.get(c.fantasy.id().unwrap()).unwrap().unwrap();
    assert_eq!((fantasy.left(), fantasy.right(), fantasy.level()), (3, 4, 2));
}
