//! End-to-end flows through hooks, repositories, the JSON store and a mock image host.

use std::sync::Arc;

use chrono::NaiveDate;
use configs::PolicyConfig;
use models::image::ImageFile;
use models::service_record::{NewServiceRecord, ServiceRecordFields};
use models::vehicle::VehicleFields;
use service::errors::ServiceError;
use service::hooks::{Outcome, ServiceRecordsForVehicle, VehicleCollection};
use service::images::mock::MockImageHost;
use service::runtime::Backend;
use service::service_records::ServiceRecordRepository;
use service::storage::JsonDocumentStore;
use service::vehicles::VehicleRepository;

type TestBackend = Backend<JsonDocumentStore, MockImageHost>;

fn backend(policy: PolicyConfig) -> TestBackend {
    Backend::assemble(Arc::new(JsonDocumentStore::in_memory()), Arc::new(MockImageHost::new()), policy)
}

fn oil_change(car_id: &str) -> NewServiceRecord {
    let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
    let mut fields = ServiceRecordFields::new(date, 50_000);
    fields.description = "Oil Change".into();
    fields.task = "Replaced engine oil and filter".into();
    fields.oil_changed = true;
    NewServiceRecord::new(car_id, fields)
}

#[tokio::test]
async fn scenario_a_vehicle_without_image() -> Result<(), ServiceError> {
    let b = backend(PolicyConfig::default());
    let civic = b
        .vehicles
        .create(VehicleFields::new("Civic EK4", "Honda Civic EK4 1.6 VTi"), None)
        .await?;
    assert!(!civic.id.is_empty());
    assert_eq!(civic.image_url, None);
    assert!(b.images.uploaded().is_empty());
    Ok(())
}

#[tokio::test]
async fn scenario_b_record_with_two_images_then_remove_one() -> Result<(), ServiceError> {
    let b = backend(PolicyConfig::default());
    let files = vec![ImageFile::new("before.jpg", vec![1]), ImageFile::new("after.jpg", vec![2])];
    let record = b.service_records.create(oil_change("V1"), files).await?;
    assert_eq!(record.image_urls.len(), 2);
    assert!(record.oil_changed);
    assert!(b.images.folders().iter().all(|f| f == "services/V1"));

    let removed = record.image_urls[0].clone();
    let removal = b.service_records.remove_image(&record.id, &removed).await?;
    assert_eq!(removal.remaining_image_urls.len(), 1);
    assert!(!removal.remaining_image_urls.contains(&removed));
    Ok(())
}

#[tokio::test]
async fn scenario_c_vehicle_delete_keeps_records() -> Result<(), ServiceError> {
    let b = backend(PolicyConfig::default());
    let car = b.vehicles.create(VehicleFields::new("Civic EK4", "EK4"), None).await?;
    let record = b.service_records.create(oil_change(&car.id), vec![]).await?;

    assert_eq!(b.vehicles.delete(&car.id).await?, car.id);
    assert!(b.vehicles.list().await?.iter().all(|v| v.id != car.id));
    let kept = b.service_records.list_for_vehicle(&car.id).await?;
    assert_eq!(kept, vec![record]);
    Ok(())
}

#[tokio::test]
async fn update_without_files_keeps_image_count() -> Result<(), ServiceError> {
    let b = backend(PolicyConfig::default());
    let files = vec![ImageFile::new("a.jpg", vec![1]), ImageFile::new("b.jpg", vec![2])];
    let record = b.service_records.create(oil_change("V1"), files).await?;
    for odometer in [50_100, 50_200] {
        let date = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let updated = b
            .service_records
            .update(&record.id, ServiceRecordFields::new(date, odometer), vec![])
            .await?;
        assert_eq!(updated.image_urls.len(), record.image_urls.len());
    }
    Ok(())
}

#[tokio::test]
async fn listings_are_idempotent_and_ordered() -> Result<(), ServiceError> {
    let b = backend(PolicyConfig::default());
    for name in ["zx", "Civic", "accord", "Beetle"] {
        b.vehicles.create(VehicleFields::new(name, "d"), None).await?;
    }
    let vehicles = b.vehicles.list().await?;
    assert!(vehicles.windows(2).all(|w| w[0].name.as_bytes() <= w[1].name.as_bytes()));

    for day in [3, 1, 7, 7, 2] {
        let date = NaiveDate::from_ymd_opt(2024, 2, day).unwrap();
        b.service_records
            .create(NewServiceRecord::new("V1", ServiceRecordFields::new(date, u64::from(day))), vec![])
            .await?;
    }
    let first = b.service_records.list_for_vehicle("V1").await?;
    assert!(first.windows(2).all(|w| w[0].date >= w[1].date));
    assert_eq!(b.service_records.list_for_vehicle("V1").await?, first);
    Ok(())
}

#[tokio::test]
async fn hooks_follow_the_store() {
    let b = backend(PolicyConfig::default());
    let cars = VehicleCollection::mount(b.vehicles.clone()).await;
    let car = cars.create(VehicleFields::new("Civic EK4", "EK4"), None).await.unwrap();

    let history = ServiceRecordsForVehicle::mount(b.service_records.clone(), None).await;
    assert!(history.records().await.is_empty());
    history.set_vehicle(Some(car.id.clone())).await;

    let files = vec![ImageFile::new("a.jpg", vec![1]), ImageFile::new("b.jpg", vec![2])];
    let record = history.create(oil_change(&car.id), files).await.unwrap();
    assert_eq!(history.records().await, vec![record.clone()]);

    let outcome = history.remove_image(&record.id, "https://elsewhere/x.jpg").await;
    assert_eq!(outcome, Outcome::failed("Image not found in service entry"));
    assert_eq!(history.remove_image(&record.id, &record.image_urls[1]).await, Outcome::ok());
    assert_eq!(history.records().await[0].image_urls, vec![record.image_urls[0].clone()]);

    assert_eq!(cars.delete(&car.id).await, Outcome::ok());
    assert!(cars.vehicles().await.is_empty());
    assert_eq!(history.fetch().await.map(|r| r.len()), Some(1));
}
