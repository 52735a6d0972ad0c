//! Operands of geo predicates.
//!
//! Only what index selection needs is modelled: which coordinate system a
//! query is expressed in and whether its region can be covered by a flat
//! (2d) or a spherical (2dsphere) index.

use bson::Bson;

/// Coordinate reference system of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Legacy `[x, y]` coordinate pairs on a plane.
    Flat,
    /// GeoJSON or `$nearSphere` / `$centerSphere` on a sphere.
    Sphere,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// GeoJSON geometry types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoJsonKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeoJsonKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Point" => GeoJsonKind::Point,
            "LineString" => GeoJsonKind::LineString,
            "Polygon" => GeoJsonKind::Polygon,
            "MultiPoint" => GeoJsonKind::MultiPoint,
            "MultiLineString" => GeoJsonKind::MultiLineString,
            "MultiPolygon" => GeoJsonKind::MultiPolygon,
            "GeometryCollection" => GeoJsonKind::GeometryCollection,
            _ => return None,
        })
    }
}

/// Region operand of `$geoWithin` / `$geoIntersects`.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Legacy point.
    Point(Point),
    /// `$box`
    Box { bottom_left: Point, top_right: Point },
    /// `$center` — flat circle, radius in coordinate units.
    Center { center: Point, radius: f64 },
    /// `$centerSphere` — spherical cap, radius in radians.
    CenterSphere { center: Point, radius: f64 },
    /// `$polygon`
    Polygon(Vec<Point>),
    /// `$geometry`
    GeoJson { kind: GeoJsonKind, coordinates: Bson },
}

impl Shape {
    /// Whether a planar covering exists for the shape (usable by 2d indexes).
    pub fn has_flat_region(&self) -> bool {
        matches!(
            self,
            Shape::Point(_) | Shape::Box { .. } | Shape::Center { .. } | Shape::Polygon(_)
        )
    }

    /// Whether a spherical covering exists for the shape (usable by 2dsphere indexes).
    pub fn has_spherical_region(&self) -> bool {
        matches!(
            self,
            Shape::Point(_)
                | Shape::Polygon(_)
                | Shape::CenterSphere { .. }
                | Shape::GeoJson { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoPredicate {
    Within,
    Intersects,
}

/// `$geoWithin` / `$geoIntersects`
#[derive(Debug, Clone, PartialEq)]
pub struct GeoQuery {
    pub predicate: GeoPredicate,
    pub shape: Shape,
}

/// `$near` / `$nearSphere`
#[derive(Debug, Clone, PartialEq)]
pub struct NearQuery {
    pub centroid: Point,
    pub crs: Crs,
    pub is_near_sphere: bool,
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
}
