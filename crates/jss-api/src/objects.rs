// Object kinds and the factory seam used by fetch-after-create.
//
// The full object model lives outside this crate. Connectors only need a
// way to turn `(kind, id)` into "whatever the caller's object is", which
// the `ObjectFactory` trait provides. `ResourceFactory` is the default:
// it GETs the object and hands back the raw document.

use std::future::Future;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::Error;
use crate::xml::Element;
use crate::xml_api::XmlApiConnector;

/// Classic API resource types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ObjectKind {
    Building,
    Category,
    Computer,
    ComputerExtensionAttribute,
    ComputerGroup,
    Department,
    DistributionPoint,
    MobileDevice,
    MobileDeviceConfigurationProfile,
    MobileDeviceGroup,
    NetworkSegment,
    OsxConfigurationProfile,
    Package,
    Policy,
    Printer,
    RestrictedSoftware,
    Script,
    Site,
}

impl ObjectKind {
    /// Collection path under `/JSSResource`.
    pub fn resource(self) -> &'static str {
        match self {
            Self::Building => "buildings",
            Self::Category => "categories",
            Self::Computer => "computers",
            Self::ComputerExtensionAttribute => "computerextensionattributes",
            Self::ComputerGroup => "computergroups",
            Self::Department => "departments",
            Self::DistributionPoint => "distributionpoints",
            Self::MobileDevice => "mobiledevices",
            Self::MobileDeviceConfigurationProfile => "mobiledeviceconfigurationprofiles",
            Self::MobileDeviceGroup => "mobiledevicegroups",
            Self::NetworkSegment => "networksegments",
            Self::OsxConfigurationProfile => "osxconfigurationprofiles",
            Self::Package => "packages",
            Self::Policy => "policies",
            Self::Printer => "printers",
            Self::RestrictedSoftware => "restrictedsoftware",
            Self::Script => "scripts",
            Self::Site => "sites",
        }
    }

    /// Root tag of a single object's document.
    pub fn root_tag(self) -> &'static str {
        match self {
            Self::OsxConfigurationProfile => "os_x_configuration_profile",
            Self::MobileDeviceConfigurationProfile => "configuration_profile",
            other => other.into(),
        }
    }

    /// `/<resource>/id/<id>`.
    pub fn id_path(self, id: u64) -> String {
        format!("/{}/id/{id}", self.resource())
    }

    /// Path that creates a new object (the server assigns the id).
    pub fn create_path(self) -> String {
        self.id_path(0)
    }
}

/// A server object as returned by the default factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiObject {
    pub kind: ObjectKind,
    pub id: u64,
    pub document: Element,
}

impl ApiObject {
    /// The object's name, from `<name>` or `<general><name>`.
    pub fn name(&self) -> Option<&str> {
        self.document
            .find_text("name")
            .or_else(|| self.document.find_text("general/name"))
    }
}

/// Builds domain objects from server ids.
///
/// `XmlApiConnector::post` calls [`get_object`](Self::get_object) once with
/// the id the server assigned, so the caller receives the object as the
/// server completed it rather than the partial document that was sent.
pub trait ObjectFactory: Sized + Send + Sync {
    type Object: Send;

    fn get_object(
        &self,
        api: &XmlApiConnector<Self>,
        kind: ObjectKind,
        id: u64,
    ) -> impl Future<Output = Result<Self::Object, Error>> + Send;
}

/// Default factory: GET `/<resource>/id/<id>` and wrap the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceFactory;

impl ObjectFactory for ResourceFactory {
    type Object = ApiObject;

    async fn get_object(
        &self,
        api: &XmlApiConnector<Self>,
        kind: ObjectKind,
        id: u64,
    ) -> Result<ApiObject, Error> {
        let document = api.get(&kind.id_path(id)).await?;
        Ok(ApiObject { kind, id, document })
    }
}
