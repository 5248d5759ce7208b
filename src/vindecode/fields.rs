//! Field vocabulary of the decoding service (ACES/VCDB codes).

pub const BASE_VEHICLE_ID: &str = "BaseVehicleID";
pub const MAKE_ID: &str = "MakeID";
pub const MODEL_ID: &str = "ModelID";
pub const SUBMODEL_ID: &str = "SubmodelID";
pub const YEAR_ID: &str = "YearID";
pub const REGION_ID: &str = "RegionID";

/// Fields identifying the vehicle.
pub const IDENTITY_FIELDS: &[&str] = &[
    BASE_VEHICLE_ID,
    MAKE_ID,
    MODEL_ID,
    SUBMODEL_ID,
    YEAR_ID,
    REGION_ID,
];

/// Configuration fields surfaced as external config attributes.
pub const CONFIG_FIELDS: &[&str] = &[
    "WheelBaseID",
    "BodyTypeID",
    "BodyNumDoorsID",
    "DriveTypeID",
    "BedLengthID",
    "BedTypeID",
    "EngineBaseID",
    "EngineDesignationID",
    "EngineVINID",
    "EngineVersionID",
    "EngineMfrID",
    "FuelTypeID",
    "FuelDeliveryTypeID",
    "FuelDeliverySubTypeID",
    "FuelSystemControlTypeID",
    "FuelSystemDesignID",
    "AspirationID",
    "CylinderHeadTypeID",
    "IgnitionSystemTypeID",
    "TransmissionTypeID",
    "TransmissionNumSpeedsID",
    "TransmissionControlTypeID",
    "TransmissionMfrCodeID",
    "BrakeSystemID",
    "FrontBrakeTypeID",
    "RearBrakeTypeID",
    "SteeringSystemID",
    "SpringTypeConfigID",
    "MfrBodyCodeID",
    "PowerOutputID",
    "ValvesID",
];

pub fn is_identity_field(name: &str) -> bool {
    IDENTITY_FIELDS.contains(&name)
}

pub fn is_config_field(name: &str) -> bool {
    CONFIG_FIELDS.contains(&name)
}

/// Every field requested by default: identity codes, then configuration.
pub fn default_requested_fields() -> Vec<&'static str> {
    IDENTITY_FIELDS
        .iter()
        .chain(CONFIG_FIELDS)
        .copied()
        .collect()
}
