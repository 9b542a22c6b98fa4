use crate::client::Client;
use crate::redis::parse::CacheId;
use crate::redis::sdk::{CachePatch, CacheParameters, Sku};
use crate::redis::validate;
use hemmer_provider_sdk::pluginsdk::{self, ResourceData};
use hemmer_provider_sdk::{commonschema, defer, tags, tf, timeouts, zones, Error};
use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;

pub fn resource_redis_cache() -> pluginsdk::Resource {
    pluginsdk::Resource {
        create: resource_redis_cache_create,
        read: resource_redis_cache_read,
        update: Some(resource_redis_cache_update),
        delete: resource_redis_cache_delete,
        importer: pluginsdk::importer_validating_resource_id(validate::cache_id),
        timeouts: pluginsdk::ResourceTimeout {
            create: Some(Duration::from_secs(90 * 60)),
            read: Some(Duration::from_secs(5 * 60)),
            update: Some(Duration::from_secs(90 * 60)),
            delete: Some(Duration::from_secs(90 * 60)),
        },
        schema_version: 1,
        state_upgraders: redis_cache_upgraders(),
        schema: pluginsdk::schema_map([
            (
                "name",
                pluginsdk::Schema {
                    type_: pluginsdk::ValueType::String,
                    required: true,
                    force_new: true,
                    ..Default::default()
                },
            ),
            ("location", commonschema::location()),
            ("resource_group_name", commonschema::resource_group_name()),
            (
                "capacity",
                pluginsdk::Schema {
                    type_: pluginsdk::ValueType::Int,
                    required: true,
                    ..Default::default()
                },
            ),
            (
                "sku",
                pluginsdk::Schema {
                    type_: pluginsdk::ValueType::List,
                    required: true,
                    max_items: 1,
                    elem: pluginsdk::Elem::resource(pluginsdk::Resource {
                        schema: pluginsdk::schema_map([
                            (
                                "name",
                                pluginsdk::Schema {
                                    type_: pluginsdk::ValueType::String,
                                    required: true,
                                    ..Default::default()
                                },
                            ),
                            (
                                "family",
                                pluginsdk::Schema {
                                    type_: pluginsdk::ValueType::String,
                                    required: true,
                                    ..Default::default()
                                },
                            ),
                        ]),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ),
            ("zones", commonschema::zones_multiple_optional()),
            (
                "hostname",
                pluginsdk::Schema {
                    type_: pluginsdk::ValueType::String,
                    computed: true,
                    ..Default::default()
                },
            ),
            ("tags", tags::schema()),
        ]),
        ..Default::default()
    }
}

fn resource_redis_cache_create(d: &mut ResourceData, meta: &dyn Any) -> Result<(), Error> {
    let client = meta.downcast_ref::<Client>().unwrap().redis.caches.clone();
    let (ctx, cancel) = timeouts::for_create(meta.stop_context(), d);
    defer!(cancel());

    let name = d.get::<String>("name");
    let id = CacheId::new(client.subscription_id(), d.get::<String>("resource_group_name"), name);
    let existing = client.get(&ctx, &id)?;
    if existing.is_some() {
        return Err(tf::import_as_exists_error("azurerm_redis_cache", id.id()));
    }

    let sku = expand_sku(d);
    let parameters = CacheParameters {
        location: d.get("location"),
        capacity: d.get("capacity"),
        sku,
        zones: zones::expand_untyped(d.get("zones")),
        tags: tags::expand(d.get("tags")),
    };
    client.create(&ctx, &id, parameters)?;

    d.set_id(id.id());
    resource_redis_cache_read(d, meta)
}

fn resource_redis_cache_read(d: &mut ResourceData, meta: &dyn Any) -> Result<(), Error> {
    let client = meta.downcast_ref::<Client>().unwrap().redis.caches.clone();
    let (ctx, cancel) = timeouts::for_read(meta.stop_context(), d);
    defer!(cancel());

    let id = CacheId::parse(&d.id())?;
    let Some(resp) = client.get(&ctx, &id)? else {
        d.set_id("");
        return Ok(());
    };

    d.set("name", id.name.clone());
    d.set("resource_group_name", id.resource_group.clone());
    if let Err(e) = d.set("location", *resp.location) {
        return Err(e);
    }
    let props = resp.properties;
    d.set("capacity", props.capacity.unwrap())?;
    d.set("sku", flatten_sku(&props.sku))?;
    let _ = d.set("zones", zones::flatten_untyped(resp.zones));
    d.set("hostname", props.host_name.clone());
    d.set("tags", tags::flatten(resp.tags));
    Ok(())
}

fn resource_redis_cache_update(d: &mut ResourceData, meta: &dyn Any) -> Result<(), Error> {
    let client = meta.downcast_ref::<Client>().unwrap().redis.caches.clone();
    let (ctx, cancel) = timeouts::for_update(meta.stop_context(), d);
    defer!(cancel());

    let id = CacheId::parse(&d.id())?;
    let mut patch = CachePatch::default();
    if d.has_change("capacity") {
        patch.capacity = Some(d.get::<i64>("capacity"));
    }
    if d.has_change("tags") {
        patch.tags = tags::expand(d.get("tags"));
    }
    client.update(&ctx, &id, patch)?;

    resource_redis_cache_read(d, meta)
}

fn resource_redis_cache_delete(d: &mut ResourceData, meta: &dyn Any) -> Result<(), Error> {
    let client = meta.downcast_ref::<Client>().unwrap().redis.caches.clone();
    let (ctx, cancel) = timeouts::for_delete(meta.stop_context(), d);
    defer!(cancel());

    let id = CacheId::parse(&d.id())?;
    client.delete(&ctx, &id)?;
    Ok(())
}

fn expand_sku(d: &ResourceData) -> Vec<Sku> {
    let family = d.get::<String>("sku.0.family");
    vec![Sku {
        name: d.get("sku.0.name"),
        family,
    }]
}

fn flatten_sku(input: &Option<Sku>) -> Vec<HashMap<String, String>> {
    let Some(sku) = input else {
        return Vec::new();
    };
    vec![HashMap::from([
        ("name", sku.name.clone()),
        ("family", sku.family.clone()),
    ])]
}

fn redis_cache_upgraders() -> HashMap<u32, pluginsdk::StateUpgrader> {
    HashMap::from([(0, pluginsdk::StateUpgrader::passthrough())])
}
