use fibre_di::{ComponentTree, Registry, ScopeId};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

// A shared service created once per application.
struct HttpClient;

// State owned by one screen; every entry on that screen shares it.
struct ScreenModel {
  id: usize,
  _http: Arc<HttpClient>,
}

// State owned by one navigation entry.
struct EntryArgs {
  screen: Arc<ScreenModel>,
}

static SCREEN_IDS: AtomicUsize = AtomicUsize::new(0);

fn main() {
  let mut registry = Registry::new().with_components(ComponentTree::builtin());
  registry
    .add_singleton(|_| {
      println!("Creating SINGLETON HttpClient...");
      Ok(HttpClient)
    })
    .unwrap();
  registry
    .add_scoped(ScopeId::VIEW_MODEL, |c| {
      let id = SCREEN_IDS.fetch_add(1, Ordering::SeqCst);
      println!("Creating ScreenModel #{}...", id);
      Ok(ScreenModel {
        id,
        _http: c.get::<HttpClient>()?,
      })
    })
    .unwrap();
  registry
    .add_scoped(ScopeId::NAVIGATION_ENTRY, |c| {
      Ok(EntryArgs {
        screen: c.get::<ScreenModel>()?,
      })
    })
    .unwrap();
  let root = registry.build();

  // Outside a view-model scope the screen model is not reachable.
  match root.get::<ScreenModel>() {
    Ok(_) => unreachable!(),
    Err(e) => println!("As expected: {}", e),
  }

  for _ in 0..2 {
    let screen = root.enter_scope(ScopeId::VIEW_MODEL).unwrap();
    let first = screen.create_scope_container(ScopeId::NAVIGATION_ENTRY).unwrap();
    let second = screen.create_scope_container(ScopeId::NAVIGATION_ENTRY).unwrap();

    let a = first.get::<EntryArgs>().unwrap();
    let b = second.get::<EntryArgs>().unwrap();
    assert!(Arc::ptr_eq(&a.screen, &b.screen));
    println!("Both entries share screen #{}", a.screen.id);
    first.dispose();
    second.dispose();
    // `screen` is disposed here, taking its cached model with it.
  }

  println!("Live scopes after both screens closed: {}", root.live_scopes());
}
