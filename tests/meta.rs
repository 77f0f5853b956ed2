mod common;

use admin_core::{Meta, MetaValue, MetaValues, Resource};
use common::{admin, create, id, record};
use serde_json::{json, Value};

#[tokio::test]
async fn scalar_setters_coerce_submitted_text() {
    let admin = admin().await;
    let res = admin.get_resource("User").unwrap();
    let mut ctx = admin.new_context();
    let mut user = res.new_record();

    let age = res.meta("Age").unwrap();
    age.set(&mut user, &MetaValue::new("Age", "28"), &mut ctx).await.unwrap();
    assert_eq!(user["Age"], json!(28));

    let active = res.meta("Active").unwrap();
    active.set(&mut user, &MetaValue::new("Active", "true"), &mut ctx).await.unwrap();
    assert_eq!(user["Active"], json!(true));
    active.set(&mut user, &MetaValue::new("Active", ""), &mut ctx).await.unwrap();
    assert_eq!(user["Active"], json!(false));
    active.set(&mut user, &MetaValue::new("Active", "f"), &mut ctx).await.unwrap();
    assert_eq!(user["Active"], json!(false));

    let registered = res.meta("RegisteredAt").unwrap();
    registered
        .set(&mut user, &MetaValue::new("RegisteredAt", "2017-01-02 15:04"), &mut ctx)
        .await
        .unwrap();
    assert_eq!(user["RegisteredAt"], json!("2017-01-02T15:04:00Z"));
    registered
        .set(&mut user, &MetaValue::new("RegisteredAt", ""), &mut ctx)
        .await
        .unwrap();
    assert_eq!(user["RegisteredAt"], Value::Null);
    assert!(!ctx.has_error());
}

#[tokio::test]
async fn coercion_failure_is_a_field_error() {
    let admin = admin().await;
    let res = admin.get_resource("User").unwrap();
    let mut ctx = admin.new_context();
    let mut user = res.new_record();

    let age = res.meta("Age").unwrap();
    age.set(&mut user, &MetaValue::new("Age", "old"), &mut ctx).await.unwrap();
    assert_eq!(user["Age"], json!(0));
    assert_eq!(ctx.errors().len(), 1);
    assert!(ctx.errors()[0]
        .message
        .starts_with("Failed to set Meta Age's value with old"));
    assert_eq!(ctx.errors()[0].column, "Age");
}

#[tokio::test]
async fn nested_path_is_loaded_lazily() {
    let admin = admin().await;
    let saved = create(
        &admin,
        "User",
        json!({"Name": "jinzhu", "Profile": {"Name": "main", "Phone": {"Num": "1234"}}}),
    )
    .await;

    let mut res = Resource::new("User", admin.registry()).unwrap();
    let meta = res
        .add_meta(Meta::new("PhoneNum").with_field_name("Profile.Phone.Num"))
        .unwrap();
    assert_eq!(meta.owner_model(), "Phone");

    let ctx = admin.new_context();
    let mut user = admin.db().first("User", &admin_core::sql::Filter::new()).await.unwrap();
    assert_eq!(user["ID"], saved["ID"]);
    assert_eq!(user["Profile"], Value::Null);

    let value = meta.value(&mut user, &ctx).await.unwrap();
    assert_eq!(value, json!("1234"));
    assert_eq!(user["Profile"]["Name"], json!("main"));
}

#[tokio::test]
async fn dotted_setters_edit_stored_relations() {
    let admin = admin().await;
    let saved = create(
        &admin,
        "User",
        json!({"Name": "jinzhu", "Company": {"Name": "acme"}, "Profile": {"Name": "main"}}),
    )
    .await;
    let company_id = saved["CompanyID"].clone();
    assert_ne!(company_id, json!(0));

    let mut res = Resource::new("User", admin.registry()).unwrap();
    res.add_meta(Meta::new("ProfileName").with_field_name("Profile.Name")).unwrap();
    res.add_meta(Meta::new("CompanyName").with_field_name("Company.Name")).unwrap();

    let mut ctx = admin.new_context();
    let mut user = admin.db().first("User", &admin_core::sql::Filter::new()).await.unwrap();
    assert!(user.get("Company").map_or(true, Value::is_null));
    res.meta("ProfileName")
        .unwrap()
        .set(&mut user, &MetaValue::new("ProfileName", "renamed"), &mut ctx)
        .await
        .unwrap();
    res.meta("CompanyName")
        .unwrap()
        .set(&mut user, &MetaValue::new("CompanyName", "acme2"), &mut ctx)
        .await
        .unwrap();
    res.call_save(&mut user, &mut ctx).await.unwrap();

    let db = admin.db();
    let all = admin_core::sql::Filter::new();
    assert_eq!(db.count("Profile", &all).await.unwrap(), 1);
    assert_eq!(db.count("Company", &all).await.unwrap(), 1);
    let stored = db.first("User", &all).await.unwrap();
    assert_eq!(stored["CompanyID"], company_id);
    assert_eq!(db.first("Company", &all).await.unwrap()["Name"], json!("acme2"));
    assert_eq!(db.first("Profile", &all).await.unwrap()["Name"], json!("renamed"));

    // nested has-one values without an ID update the stored row
    let mut user = db.first("User", &all).await.unwrap();
    let values = MetaValues::new().with(MetaValue::nested(
        "Profile",
        None,
        MetaValues::new().with(MetaValue::new("Name", "nested")),
    ));
    let users = admin.get_resource("User").unwrap();
    users.decode(&mut ctx, &mut user, &values).await.unwrap();
    users.call_save(&mut user, &mut ctx).await.unwrap();
    assert_eq!(db.count("Profile", &all).await.unwrap(), 1);
    assert_eq!(db.first("Profile", &all).await.unwrap()["Name"], json!("nested"));
    assert!(!ctx.has_error());
}

#[tokio::test]
async fn invalid_paths_are_rejected() {
    let admin = admin().await;
    let mut res = Resource::new("User", admin.registry()).unwrap();
    let err = res
        .add_meta(Meta::new("Street").with_field_name("Profile.Street"))
        .unwrap_err();
    assert_eq!(err.to_string(), "meta User no field: Street");
    assert!(res.add_meta(Meta::new("City").with_field_name("Addresses.Address1")).is_err());
}

#[tokio::test]
async fn belongs_to_setter_follows_submitted_key() {
    let admin = admin().await;
    let card = create(&admin, "CreditCard", json!({"Number": "4111", "Issuer": "VISA"})).await;
    let res = admin.get_resource("User").unwrap();
    let meta = res.meta("CreditCard").unwrap();
    let mut ctx = admin.new_context();
    let mut user = res.new_record();

    meta.set(&mut user, &MetaValue::new("CreditCard", id(&card).to_string()), &mut ctx)
        .await
        .unwrap();
    assert_eq!(user["CreditCardID"], json!(id(&card)));
    assert_eq!(user["CreditCard"]["Number"], json!("4111"));

    // same key again leaves the loaded object alone
    user["CreditCard"]["Issuer"] = json!("edited");
    meta.set(&mut user, &MetaValue::new("CreditCard", id(&card).to_string()), &mut ctx)
        .await
        .unwrap();
    assert_eq!(user["CreditCard"]["Issuer"], json!("edited"));

    meta.set(&mut user, &MetaValue::new("CreditCard", ""), &mut ctx).await.unwrap();
    assert_eq!(user["CreditCardID"], json!(0));
    assert_eq!(user["CreditCard"], Value::Null);
}

#[tokio::test]
async fn nested_belongs_to_values_build_the_target() {
    let admin = admin().await;
    let res = admin.get_resource("User").unwrap();
    let mut ctx = admin.new_context();
    let mut user = res.new_record();
    let values = MetaValues::new()
        .with(MetaValue::new("Name", "jinzhu"))
        .with(MetaValue::nested(
            "CreditCard",
            None,
            MetaValues::new().with(MetaValue::new("Number", "5500")),
        ));

    res.decode(&mut ctx, &mut user, &values).await.unwrap();
    assert_eq!(user["CreditCard"]["Number"], json!("5500"));
    res.call_save(&mut user, &mut ctx).await.unwrap();

    let stored = admin.db().find_association("User", &user, "CreditCard").await.unwrap();
    assert_eq!(stored["Number"], json!("5500"));
    assert_eq!(user["CreditCardID"], stored["ID"]);
}

#[tokio::test]
async fn custom_setter_and_valuer_replace_defaults() {
    let admin = admin().await;
    let mut res = Resource::new("User", admin.registry()).unwrap();
    let meta = res
        .add_meta(
            Meta::new("Name")
                .with_setter(
                    |record: &mut admin_core::Record,
                     value: &MetaValue,
                     _: &mut admin_core::Context|
                     -> Result<(), admin_core::AppError> {
                        let name = admin_core::codec::to_string(&value.value).to_uppercase();
                        record.insert("Name".into(), Value::String(name));
                        Ok(())
                    },
                )
                .with_formatted_valuer(|record: &admin_core::Record, _: &admin_core::Context| {
                    json!(format!("<{}>", record["Name"].as_str().unwrap_or_default()))
                }),
        )
        .unwrap();

    let mut ctx = admin.new_context();
    let mut user = record(json!({"ID": 0, "Name": ""}));
    meta.set(&mut user, &MetaValue::new("Name", "qor"), &mut ctx).await.unwrap();
    assert_eq!(user["Name"], json!("QOR"));
    assert_eq!(meta.value(&mut user, &ctx).await.unwrap(), json!("QOR"));
    assert_eq!(meta.formatted_value(&mut user, &ctx).await.unwrap(), json!("<QOR>"));
}
