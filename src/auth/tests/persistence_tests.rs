//! Persistence of ACL containers across environment lifecycles

use rolegate_auth::acl::AclSnapshot;
use rolegate_auth::{
    AclEnvironment, AuthConfig, AuthError, Identity, JsonFileMemory, MemoryProvider,
    RoleResolver, RoleSet, SessionAuthenticator,
};
use std::sync::Arc;

fn environment(config: &AuthConfig, roles: RoleSet) -> AclEnvironment {
    let auth = Arc::new(SessionAuthenticator::with_identity(Identity::new(1)));
    let resolver = Arc::new(RoleResolver::with_config(auth, config).unwrap());
    resolver.register_hook(move |_: Option<&Identity>, _: &RoleSet| Some(roles.clone()));
    AclEnvironment::with_config(resolver, config).unwrap()
}

#[test]
fn test_json_file_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acl.json");
    let config = AuthConfig::default();

    // First process: configure two containers and flush
    {
        let memory: Arc<dyn MemoryProvider> = Arc::new(JsonFileMemory::open(&path).unwrap());
        let env = environment(&config, RoleSet::single("Admin"));

        let site = env.make(None, Some(memory.clone())).unwrap();
        site.add_role("admin").unwrap();
        site.add_action("manage").unwrap();
        site.allow("admin", "manage").unwrap();

        let blog = env.make("blog", Some(memory.clone())).unwrap();
        blog.add_action("comment").unwrap();
        blog.allow("guest", "comment").unwrap();

        env.finish().unwrap();
        memory.finish().unwrap();
    }

    // Second process: same file, different identity
    let memory: Arc<dyn MemoryProvider> = Arc::new(JsonFileMemory::open(&path).unwrap());
    let env = environment(&config, RoleSet::single("Guest"));

    let site = env.make(None, Some(memory.clone())).unwrap();
    let blog = env.make("blog", Some(memory.clone())).unwrap();

    assert!(site.check("admin", "manage").unwrap());
    assert!(!site.can("manage").unwrap());
    assert!(blog.can("comment").unwrap());

    let raw = memory.get("acl_default").unwrap().unwrap();
    let snapshot: AclSnapshot = serde_json::from_value(raw).unwrap();
    assert_eq!(snapshot.roles, vec!["guest", "admin"]);
    assert_eq!(snapshot.actions, vec!["manage"]);
}

#[test]
fn test_configured_names_flow_through() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acl.json");
    let config = AuthConfig::from_toml_str(
        r#"
        guest_role = "Visitor"
        default_driver = "portal"
        "#,
    )
    .unwrap();

    let memory: Arc<dyn MemoryProvider> = Arc::new(JsonFileMemory::open(&path).unwrap());
    let auth = Arc::new(SessionAuthenticator::new());
    let resolver = Arc::new(RoleResolver::with_config(auth, &config).unwrap());
    let env: AclEnvironment = AclEnvironment::with_config(resolver.clone(), &config).unwrap();

    let portal = env.make(None, Some(memory.clone())).unwrap();
    portal.add_role("visitor").unwrap();
    portal.add_action("browse").unwrap();
    portal.allow("visitor", "browse").unwrap();

    assert!(resolver.is("Visitor"));
    assert!(portal.can("browse").unwrap());

    env.finish().unwrap();
    assert!(memory.get("acl_portal").unwrap().is_some());
}

#[test]
fn test_corrupt_persisted_container_surfaces_on_make() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acl.json");
    std::fs::write(&path, r#"{"acl_default": {"acl": "nope"}}"#).unwrap();

    let memory: Arc<dyn MemoryProvider> = Arc::new(JsonFileMemory::open(&path).unwrap());
    let env = environment(&AuthConfig::default(), RoleSet::single("Guest"));

    let result = env.make(None, Some(memory));
    assert!(matches!(result, Err(AuthError::Snapshot(_))));
    assert!(env.is_empty());
}
