mod common;

use admin_core::{
    AppError, FindMany, FindOne, MetaValue, MetaValues, Permission, PermissionMode, Resource,
};
use common::{admin, create, id};
use serde_json::json;

#[tokio::test]
async fn create_then_find_one_and_many() {
    let admin = admin().await;
    let res = admin.get_resource("users").unwrap();
    let mut ctx = admin.new_context();

    for name in ["a", "b", "c"] {
        let mut user = res.new_record();
        let values = MetaValues::new()
            .with(MetaValue::new("Name", name))
            .with(MetaValue::new("Age", "20"));
        res.decode(&mut ctx, &mut user, &values).await.unwrap();
        res.call_save(&mut user, &mut ctx).await.unwrap();
        assert!(!res.schema().primary_key_is_zero(&user));
    }

    let FindMany::Records(users) = res.call_find_many(&mut ctx).await.unwrap() else {
        panic!("expected records");
    };
    let names: Vec<&str> = users.iter().map(|u| u["Name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["c", "b", "a"]);

    ctx.count_only = true;
    assert_eq!(res.call_find_many(&mut ctx).await.unwrap(), FindMany::Count(3));

    let first_id = id(&users[2]);
    let mut ctx = admin.new_context().with_resource_id(first_id.to_string());
    let mut found = res.new_record();
    assert_eq!(
        res.call_find_one(&mut found, None, &mut ctx).await.unwrap(),
        FindOne::Found
    );
    assert_eq!(found["Name"], json!("a"));
    assert_eq!(found["Age"], json!(20));
}

#[tokio::test]
async fn unmatched_identifiers_are_not_found() {
    let admin = admin().await;
    create(&admin, "User", json!({"Name": "jinzhu"})).await;
    let res = admin.get_resource("User").unwrap();

    for id in ["", "999", "abc", "1,2"] {
        let mut ctx = admin.new_context().with_resource_id(id);
        let mut record = res.new_record();
        let result = res.call_find_one(&mut record, None, &mut ctx).await;
        assert!(matches!(result, Err(AppError::RecordNotFound)), "id {:?}", id);
    }
}

#[tokio::test]
async fn delete_removes_the_addressed_record() {
    let admin = admin().await;
    let keep = create(&admin, "User", json!({"Name": "keep"})).await;
    let gone = create(&admin, "User", json!({"Name": "gone"})).await;
    let res = admin.get_resource("User").unwrap();

    let mut ctx = admin.new_context().with_resource_id(id(&gone).to_string());
    let mut record = res.new_record();
    res.call_delete(&mut record, &mut ctx).await.unwrap();
    assert_eq!(record["Name"], json!("gone"));

    let mut again = res.new_record();
    assert!(matches!(
        res.call_delete(&mut again, &mut ctx).await,
        Err(AppError::RecordNotFound)
    ));

    let mut ctx = admin.new_context();
    ctx.count_only = true;
    assert_eq!(res.call_find_many(&mut ctx).await.unwrap(), FindMany::Count(1));
    let mut ctx = admin.new_context().with_resource_id(id(&keep).to_string());
    let mut record = res.new_record();
    res.call_find_one(&mut record, None, &mut ctx).await.unwrap();
}

#[tokio::test]
async fn destroy_flag_deletes_through_find_one() {
    let admin = admin().await;
    let user = create(&admin, "User", json!({"Name": "jinzhu"})).await;
    let res = admin.get_resource("User").unwrap();
    let values = MetaValues::new()
        .with(MetaValue::new("ID", id(&user).to_string()))
        .with(MetaValue::new("_destroy", "1"));

    let mut ctx = admin.new_context();
    let mut record = res.new_record();
    assert_eq!(
        res.call_find_one(&mut record, Some(&values), &mut ctx).await.unwrap(),
        FindOne::Destroyed
    );
    ctx.count_only = true;
    assert_eq!(res.call_find_many(&mut ctx).await.unwrap(), FindMany::Count(0));
}

#[tokio::test]
async fn destroy_flag_without_delete_permission_only_loads() {
    let admin = admin().await;
    let user = create(&admin, "User", json!({"Name": "jinzhu"})).await;
    let res = Resource::new("User", admin.registry())
        .unwrap()
        .with_permission(Permission::deny(PermissionMode::Delete, &["viewer"]));
    let values = MetaValues::new()
        .with(MetaValue::new("ID", id(&user).to_string()))
        .with(MetaValue::new("_destroy", "true"));

    let mut ctx = admin.new_context().with_roles(["viewer"]);
    let mut record = res.new_record();
    assert_eq!(
        res.call_find_one(&mut record, Some(&values), &mut ctx).await.unwrap(),
        FindOne::Found
    );
    assert_eq!(record["Name"], json!("jinzhu"));
    assert!(matches!(
        res.call_delete(&mut record, &mut ctx).await,
        Err(AppError::PermissionDenied)
    ));
}

#[tokio::test]
async fn permissions_guard_every_handler() {
    let admin = admin().await;
    let res = Resource::new("User", admin.registry())
        .unwrap()
        .with_permission(
            Permission::allow(PermissionMode::Read, &["admin", "viewer"])
                .and_allow(PermissionMode::Create, &["admin"])
                .and_allow(PermissionMode::Update, &["admin"]),
        );

    let mut viewer = admin.new_context().with_roles(["viewer"]);
    assert!(res.call_find_many(&mut viewer).await.is_ok());
    let mut user = res.new_record();
    user.insert("Name".into(), json!("x"));
    assert!(matches!(
        res.call_save(&mut user, &mut viewer).await,
        Err(AppError::PermissionDenied)
    ));

    let mut admin_ctx = admin.new_context().with_roles(["admin"]);
    res.call_save(&mut user, &mut admin_ctx).await.unwrap();

    let mut nobody = admin.new_context();
    assert!(matches!(
        res.call_find_many(&mut nobody).await,
        Err(AppError::PermissionDenied)
    ));
}

#[tokio::test]
async fn model_validations_fail_the_save() {
    let admin = admin().await;
    let res = admin.get_resource("User").unwrap();
    let mut ctx = admin.new_context();
    let mut user = res.new_record();
    match res.call_save(&mut user, &mut ctx).await {
        Err(AppError::Validation(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].message, "Name can't be blank");
            assert_eq!(errors[0].column, "Name");
        }
        other => panic!("expected validation error, got {:?}", other.err()),
    }

    let mut ctx = admin.new_context();
    ctx.count_only = true;
    assert_eq!(res.call_find_many(&mut ctx).await.unwrap(), FindMany::Count(0));
}

#[tokio::test]
async fn validators_and_processors_run_around_metas() {
    let admin = admin().await;
    let mut res = Resource::new("User", admin.registry()).unwrap();
    res.add_default_metas().unwrap();
    res.add_validator(
        "adult",
        |_: &admin_core::Record, values: &MetaValues, _: &mut admin_core::Context| -> Result<(), AppError> {
            let age = values
                .get("Age")
                .map(|v| admin_core::codec::to_uint(&v.value).unwrap_or(0))
                .unwrap_or(0);
            if age < 18 {
                return Err(AppError::Validation(vec![admin_core::ValidationError::new(
                    "User", "", "Age", "too young",
                )]));
            }
            Ok(())
        },
    );
    res.add_processor(
        "role",
        |record: &mut admin_core::Record, _: &MetaValues, _: &mut admin_core::Context| -> Result<(), AppError> {
            record.insert("Role".into(), json!("member"));
            Ok(())
        },
    );

    let mut ctx = admin.new_context();
    let mut user = res.new_record();
    let values = MetaValues::new()
        .with(MetaValue::new("Name", "kid"))
        .with(MetaValue::new("Age", "9"));
    res.decode(&mut ctx, &mut user, &values).await.unwrap();
    assert_eq!(ctx.errors().len(), 1);
    assert_eq!(ctx.errors()[0].message, "too young");
    assert_eq!(user["Role"], json!("member"));
    assert_eq!(user["Age"], json!(9));
}

#[tokio::test]
async fn sessions_can_skip_validations() {
    let admin = admin().await;
    let schema = admin.registry().parse("User").unwrap();
    let mut user = schema.new_record();

    let skipping = admin.db().with_skip_validations(true);
    skipping.save("User", &mut user).await.unwrap();
    assert!(!schema.primary_key_is_zero(&user));

    assert!(!skipping.session().skip_validations());
    let mut other = schema.new_record();
    assert!(matches!(
        admin.db().session().save("User", &mut other).await,
        Err(AppError::Validation(_))
    ));
}
