//! Embed-edge validation: cycles, duplicates, conflicts, deletion guards.

use stencil::{
    BlueprintKind, FieldType, NewBlueprint, NewField, ScalarType, SchemaComposer, SchemaError,
    StencilConfig,
};
use tempfile::tempdir;

fn composer(dir: &tempfile::TempDir) -> SchemaComposer {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = StencilConfig::new(dir.path().join("db"));
    SchemaComposer::new(&config).expect("failed to open store")
}

fn component(composer: &SchemaComposer, code: &str) -> stencil::Blueprint {
    composer
        .create_blueprint(NewBlueprint::new(code, code, BlueprintKind::Component))
        .expect("failed to create component")
}

fn text_field(composer: &SchemaComposer, blueprint: &stencil::Blueprint, name: &str) {
    composer
        .create_field(
            blueprint.id,
            NewField::new(name, FieldType::Scalar(ScalarType::Text)),
        )
        .expect("failed to create field");
}

#[test]
fn self_embed_is_rejected() {
    let dir = tempdir().unwrap();
    let composer = composer(&dir);
    let a = component(&composer, "a");

    let err = composer.create_embed(a.id, a.id, None).unwrap_err();
    assert!(matches!(err, SchemaError::CyclicDependency { .. }));
}

#[test]
fn reverse_embed_closes_a_cycle() {
    let dir = tempdir().unwrap();
    let composer = composer(&dir);
    let a = component(&composer, "a");
    let b = component(&composer, "b");
    let c = component(&composer, "c");
    text_field(&composer, &b, "x");
    text_field(&composer, &c, "y");

    composer.create_embed(a.id, b.id, None).expect("a embeds b");

    let err = composer.create_embed(b.id, a.id, None).unwrap_err();
    match err {
        SchemaError::CyclicDependency { host, embedded } => {
            assert_eq!(host, "b");
            assert_eq!(embedded, "a");
        }
        other => panic!("expected CyclicDependency, got {:?}", other),
    }

    // An unrelated component is still fine.
    composer.create_embed(b.id, c.id, None).expect("b embeds c");
}

#[test]
fn transitive_cycle_is_rejected() {
    let dir = tempdir().unwrap();
    let composer = composer(&dir);
    let a = component(&composer, "a");
    let b = component(&composer, "b");
    let c = component(&composer, "c");
    text_field(&composer, &b, "x");
    text_field(&composer, &c, "y");

    composer.create_embed(a.id, b.id, None).unwrap();
    composer.create_embed(b.id, c.id, None).unwrap();

    let err = composer.create_embed(c.id, a.id, None).unwrap_err();
    assert!(matches!(err, SchemaError::CyclicDependency { .. }));
}

#[test]
fn embeddable_listing_excludes_cycle_closers_and_self() {
    let dir = tempdir().unwrap();
    let composer = composer(&dir);
    let a = component(&composer, "a");
    let b = component(&composer, "b");
    let c = component(&composer, "c");
    text_field(&composer, &b, "x");
    composer.create_embed(a.id, b.id, None).unwrap();

    let for_b: Vec<String> = composer
        .embeddable_blueprints_for(b.id)
        .unwrap()
        .into_iter()
        .map(|bp| bp.code)
        .collect();
    // Not itself, not `a` (which already depends on b).
    assert_eq!(for_b, vec!["c".to_string()]);

    let for_a: Vec<String> = composer
        .embeddable_blueprints_for(a.id)
        .unwrap()
        .into_iter()
        .map(|bp| bp.code)
        .collect();
    assert_eq!(for_a, vec!["b".to_string(), "c".to_string()]);
    let _ = c;
}

#[test]
fn duplicate_triple_is_rejected_but_second_anchor_is_allowed() {
    let dir = tempdir().unwrap();
    let composer = composer(&dir);
    let host = composer
        .create_blueprint(NewBlueprint::new("Company", "company", BlueprintKind::Full))
        .unwrap();
    let address = component(&composer, "address");
    text_field(&composer, &address, "street");

    let office = composer
        .create_field(host.id, NewField::new("office", FieldType::Group))
        .unwrap();
    let warehouse = composer
        .create_field(host.id, NewField::new("warehouse", FieldType::Group))
        .unwrap();

    composer
        .create_embed(host.id, address.id, Some(office.id))
        .expect("first embed");
    let err = composer
        .create_embed(host.id, address.id, Some(office.id))
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidData(_)));

    // Same component under a different anchor is a separate composition.
    composer
        .create_embed(host.id, address.id, Some(warehouse.id))
        .expect("second anchor");

    let paths: Vec<String> = composer
        .list_fields(host.id)
        .unwrap()
        .into_iter()
        .map(|f| f.full_path)
        .collect();
    assert!(paths.contains(&"office.street".to_string()));
    assert!(paths.contains(&"warehouse.street".to_string()));
}

#[test]
fn only_components_can_be_embedded() {
    let dir = tempdir().unwrap();
    let composer = composer(&dir);
    let a = component(&composer, "a");
    let full = composer
        .create_blueprint(NewBlueprint::new("Page", "page", BlueprintKind::Full))
        .unwrap();

    let err = composer.create_embed(a.id, full.id, None).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidData(_)));
}

#[test]
fn conflict_detection_sees_through_nesting() {
    let dir = tempdir().unwrap();
    let composer = composer(&dir);

    // b has an authored field author.bio.
    let b = composer
        .create_blueprint(NewBlueprint::new("Post", "post", BlueprintKind::Full))
        .unwrap();
    let author = composer
        .create_field(b.id, NewField::new("author", FieldType::Group))
        .unwrap();
    composer
        .create_field(
            b.id,
            NewField::new("bio", FieldType::Scalar(ScalarType::Text)).with_parent(author.id),
        )
        .unwrap();

    // c embeds d, and d has a root-level `bio`.
    let c = component(&composer, "c");
    let d = component(&composer, "d");
    text_field(&composer, &d, "bio");
    composer.create_embed(c.id, d.id, None).unwrap();

    let err = composer
        .create_embed(b.id, c.id, Some(author.id))
        .unwrap_err();
    match err {
        SchemaError::PathConflict {
            path,
            host,
            embedded,
        } => {
            assert_eq!(path, "author.bio");
            assert_eq!(host, "post");
            assert_eq!(embedded, "c");
        }
        other => panic!("expected PathConflict, got {:?}", other),
    }

    // Nothing was written: no copies, no edge.
    let fields = composer.list_fields(b.id).unwrap();
    assert_eq!(fields.len(), 2);
    assert!(composer.db().list_embeds_for_host(b.id).unwrap().is_empty());
}

#[test]
fn embed_that_collides_only_in_a_grandparent_host_is_rejected() {
    let dir = tempdir().unwrap();
    let composer = composer(&dir);

    // g authors a group `a` with a child `a.y`, and embeds the (empty)
    // component h at that group.
    let g = composer
        .create_blueprint(NewBlueprint::new("Grand", "g", BlueprintKind::Full))
        .unwrap();
    let a = composer
        .create_field(g.id, NewField::new("a", FieldType::Group))
        .unwrap();
    composer
        .create_field(
            g.id,
            NewField::new("y", FieldType::Scalar(ScalarType::Text)).with_parent(a.id),
        )
        .unwrap();
    let h = component(&composer, "h");
    let c = component(&composer, "c");
    text_field(&composer, &c, "y");
    composer.create_embed(g.id, h.id, Some(a.id)).unwrap();

    // Embedding c into h is clean inside h, but g would re-export c's `y`
    // as `a.y` on top of its own authored field.
    let err = composer.create_embed(h.id, c.id, None).unwrap_err();
    match err {
        SchemaError::PathConflict { path, host, .. } => {
            assert_eq!(path, "a.y");
            assert_eq!(host, "g");
        }
        other => panic!("expected PathConflict, got {:?}", other),
    }

    // No edge was written and g's paths stayed unique.
    assert!(composer.db().list_embeds_for_host(h.id).unwrap().is_empty());
    let paths: Vec<String> = composer
        .list_fields(g.id)
        .unwrap()
        .into_iter()
        .map(|f| f.full_path)
        .collect();
    assert_eq!(paths.iter().filter(|p| p.as_str() == "a.y").count(), 1);
}

#[test]
fn conflict_against_previously_materialized_fields() {
    let dir = tempdir().unwrap();
    let composer = composer(&dir);
    let host = component(&composer, "host");
    let a = component(&composer, "a");
    let b = component(&composer, "b");
    text_field(&composer, &a, "slug");
    text_field(&composer, &b, "slug");

    composer.create_embed(host.id, a.id, None).unwrap();
    let err = composer.create_embed(host.id, b.id, None).unwrap_err();
    assert!(matches!(err, SchemaError::PathConflict { .. }));
}

#[test]
fn delete_blueprint_guards() {
    let dir = tempdir().unwrap();
    let composer = composer(&dir);

    let article = composer
        .create_blueprint(
            NewBlueprint::new("Article", "article", BlueprintKind::Full)
                .with_entry_type("articles"),
        )
        .unwrap();
    let seo = component(&composer, "seo");
    text_field(&composer, &seo, "title");
    composer.create_embed(article.id, seo.id, None).unwrap();

    // Backing an entry type blocks deletion.
    let check = composer.can_delete_blueprint(article.id).unwrap();
    assert!(!check.can_delete);
    assert_eq!(check.reasons, vec!["backs content-entry type 'articles'"]);
    let err = composer.delete_blueprint(article.id).unwrap_err();
    assert!(matches!(err, SchemaError::SchemaInUse { .. }));

    // Being embedded blocks deletion, with its own reason.
    let check = composer.can_delete_blueprint(seo.id).unwrap();
    assert!(!check.can_delete);
    assert_eq!(check.reasons, vec!["embedded in 1 blueprint(s)"]);

    // Removing the embed frees the component.
    let embed = composer.db().list_embeds_for_host(article.id).unwrap()[0].clone();
    composer.delete_embed(embed.id).unwrap();
    assert!(composer.can_delete_blueprint(seo.id).unwrap().can_delete);
    composer.delete_blueprint(seo.id).unwrap();
    assert!(composer.get_blueprint(seo.id).is_err());
}

#[test]
fn blueprint_codes_are_unique_per_kind() {
    let dir = tempdir().unwrap();
    let composer = composer(&dir);

    component(&composer, "card");
    let err = composer
        .create_blueprint(NewBlueprint::new("Card 2", "card", BlueprintKind::Component))
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidData(_)));

    // Same code under the other kind is a different namespace.
    composer
        .create_blueprint(NewBlueprint::new("Card", "card", BlueprintKind::Full))
        .expect("full 'card' alongside component 'card'");
}
