use cucumber::given;

use crate::cucumber::{delivery_world::DeliverySystem, DeliveryWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut DeliveryWorld) {
    let system = DeliverySystem::new().await;
    world.system = Some(system);
}

#[given(expr = "the distance service reports {int} m as {string} taking {string}")]
async fn distance_service_reports(world: &mut DeliveryWorld, meters: u64, distance: String, duration: String) {
    world.system().resolver.set(meters, &distance, &duration);
}

#[given("the distance service is down")]
async fn distance_service_down(world: &mut DeliveryWorld) {
    world.system().resolver.fail();
}

#[given(expr = "the service radius is {int} km")]
async fn service_radius(world: &mut DeliveryWorld, km: u64) {
    world.system().schedule.service_radius_meters = km * 1000;
}
