use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::DriverAPI,
    auth::{Platform, User},
    db::Store,
    entities::{Coordinates, Driver, DriverRateProfile},
    error::Error,
};

#[async_trait]
impl<S: Store> DriverAPI for Engine<S> {
    #[tracing::instrument(skip(self))]
    async fn create_driver(
        &self,
        user: User,
        driver_id: Uuid,
        rates: DriverRateProfile,
    ) -> Result<Driver, Error> {
        self.authorize(user.clone(), "create_driver", Platform::default())?;

        let driver = Driver::new(driver_id, rates, self.now())?;

        self.store.insert_driver(&driver).await?;

        Ok(driver)
    }

    #[tracing::instrument(skip(self))]
    async fn find_driver(&self, user: User, id: Uuid) -> Result<Driver, Error> {
        let driver = self.fetch_driver(id).await?;

        self.authorize(user.clone(), "read", driver.clone())?;

        Ok(driver)
    }

    #[tracing::instrument(skip(self))]
    async fn update_driver_location(
        &self,
        user: User,
        id: Uuid,
        location: Coordinates,
    ) -> Result<(), Error> {
        location.validate()?;

        let driver = self.fetch_driver(id).await?;

        self.authorize(user.clone(), "update_location", driver)?;

        self.store
            .update_driver_location(id, location, self.now())
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn update_driver_rates(
        &self,
        user: User,
        id: Uuid,
        rates: DriverRateProfile,
    ) -> Result<Driver, Error> {
        rates.validate()?;

        let mut driver = self.fetch_driver(id).await?;

        self.authorize(user.clone(), "update_rates", driver.clone())?;

        driver.rates = rates;

        self.store.update_driver(&driver).await?;

        Ok(driver)
    }
}
