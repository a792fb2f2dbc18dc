//! Immutable element descriptors and the builder that produces them.

use std::fmt;
use std::rc::Rc;

use crate::error::BuildError;
use crate::hooks::Hooks;
use crate::host::TEXT_VALUE_PROP;
use crate::props::{PropValue, Props};

/// Signature of a component function.
///
/// A component receives its hook context and props and returns exactly one
/// element, its rendered output.
pub type RenderFn = fn(&mut Hooks, &Props) -> Result<Element, BuildError>;

/// A named component function.
///
/// Two components are the same type when they point at the same function.
#[derive(Clone, Copy)]
pub struct Component {
    name: &'static str,
    render: RenderFn,
}

impl Component {
    pub const fn new(name: &'static str, render: RenderFn) -> Self {
        Self { name, render }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn render(&self, hooks: &mut Hooks, props: &Props) -> Result<Element, BuildError> {
        (self.render)(hooks, props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.render as usize == other.render as usize
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum ElementType {
    /// Native node kind such as `div`.
    Host(Rc<str>),
    /// Text carrier; its value lives under [`TEXT_VALUE_PROP`].
    Text,
    /// Groups children without a native node of its own.
    Fragment,
    Component(Component),
}

impl ElementType {
    pub fn label(&self) -> &str {
        match self {
            ElementType::Host(tag) => tag,
            ElementType::Text => "#text",
            ElementType::Fragment => "#fragment",
            ElementType::Component(component) => component.name(),
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Component(component) => component.fmt(f),
            other => f.write_str(other.label()),
        }
    }
}

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        ElementType::Host(Rc::from(tag))
    }
}

impl From<Component> for ElementType {
    fn from(component: Component) -> Self {
        ElementType::Component(component)
    }
}

#[derive(Clone)]
pub struct Element {
    ty: ElementType,
    props: Rc<Props>,
}

impl Element {
    pub fn element_type(&self) -> &ElementType {
        &self.ty
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub(crate) fn shared_props(&self) -> Rc<Props> {
        Rc::clone(&self.props)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("type", &self.ty)
            .field("props", &self.props)
            .field("children", &self.props.children())
            .finish()
    }
}

/// A child argument to [`build`]: either a ready element or a raw value.
#[derive(Clone, Debug)]
pub enum Child {
    Element(Element),
    Value(PropValue),
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Element(element)
    }
}

impl From<PropValue> for Child {
    fn from(value: PropValue) -> Self {
        Child::Value(value)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Value(value.into())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Value(value.into())
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Value(value.into())
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Value(value.into())
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Value(value.into())
    }
}

/// Builds an element descriptor.
///
/// Any `children` already present on `props` are replaced by `children`.
/// String and number children are wrapped into text elements; other raw
/// values are rejected with [`BuildError::MalformedChild`].
pub fn build<C>(
    ty: impl Into<ElementType>,
    props: Props,
    children: impl IntoIterator<Item = C>,
) -> Result<Element, BuildError>
where
    C: Into<Child>,
{
    let children = children
        .into_iter()
        .enumerate()
        .map(|(index, child)| match child.into() {
            Child::Element(element) => Ok(element),
            Child::Value(value) if value.is_primitive_text() => Ok(text(value)),
            Child::Value(value) => Err(BuildError::MalformedChild {
                index,
                found: value.kind(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Element {
        ty: ty.into(),
        props: Rc::new(props.with_children(children)),
    })
}

/// Element with no children.
pub fn leaf(ty: impl Into<ElementType>, props: Props) -> Element {
    Element {
        ty: ty.into(),
        props: Rc::new(props),
    }
}

pub fn text(value: impl Into<PropValue>) -> Element {
    leaf(ElementType::Text, Props::new().with(TEXT_VALUE_PROP, value))
}

pub fn fragment<C>(children: impl IntoIterator<Item = C>) -> Result<Element, BuildError>
where
    C: Into<Child>,
{
    build(ElementType::Fragment, Props::new(), children)
}
