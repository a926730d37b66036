//! Route and stack codec

use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

use wayfarer_stack::{LayoutKey, Location, Route, RouteParser, Stack, StackError};

use crate::converter::ConverterRegistry;
use crate::error::RestoreError;
use crate::format::{RouteRecord, SerializedRoute, SerializedStack};
use crate::Result;

pub struct RouteCodec<R> {
    parser: Arc<dyn RouteParser<R>>,
    converters: ConverterRegistry<R>,
    base: Url,
    layouts: HashSet<LayoutKey>,
}

impl<R: Route> RouteCodec<R> {
    pub fn new(parser: Arc<dyn RouteParser<R>>, base: Url) -> Self {
        Self {
            parser,
            converters: ConverterRegistry::new(),
            base,
            layouts: HashSet::new(),
        }
    }

    pub fn with_converters(mut self, converters: ConverterRegistry<R>) -> Self {
        self.converters = converters;
        self
    }

    /// Layout types a decoded route may declare as its owner
    pub fn with_layouts(mut self, layouts: impl IntoIterator<Item = LayoutKey>) -> Self {
        self.layouts.extend(layouts);
        self
    }

    pub fn converters(&self) -> &ConverterRegistry<R> {
        &self.converters
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Converter record when the route names a converter, else its location.
    pub fn encode_route(&self, route: &R) -> Result<SerializedRoute> {
        if let Some(key) = route.converter() {
            let value = self.converters.get(key)?.encode(route)?;
            return Ok(SerializedRoute::Record(RouteRecord::Converter {
                converter: key.to_string(),
                value,
            }));
        }

        route
            .location()
            .map(SerializedRoute::Location)
            .ok_or_else(|| RestoreError::NotRestorable {
                route: format!("{:?}", route),
            })
    }

    pub async fn decode_route(&self, element: &SerializedRoute) -> Result<R> {
        let route = match element {
            SerializedRoute::Location(raw) => {
                let location = Location::parse(raw, &self.base)?;
                self.parser.parse(&location).await?
            }
            SerializedRoute::Record(RouteRecord::Converter { converter, value }) => {
                self.converters.get(converter)?.decode(value)?
            }
        };

        if let Some(owner) = route.owner() {
            if !self.layouts.contains(&owner) {
                tracing::error!(layout = %owner, route = ?route, "Restored route names an unregistered layout");
                return Err(RestoreError::UnregisteredLayout {
                    layout: owner.to_string(),
                    route: format!("{:?}", route),
                });
            }
        }

        Ok(route)
    }

    pub async fn decode_routes(&self, elements: &[SerializedRoute]) -> Result<Vec<R>> {
        let mut routes = Vec::with_capacity(elements.len());
        for element in elements {
            routes.push(self.decode_route(element).await?);
        }
        Ok(routes)
    }

    pub fn encode_stack(&self, stack: &Stack<R>) -> Result<SerializedStack> {
        if stack.kind().is_indexed() {
            return Ok(SerializedStack::Index(stack.active_index().unwrap_or(0)));
        }

        let routes = stack
            .routes()
            .iter()
            .map(|route| self.encode_route(route))
            .collect::<Result<Vec<_>>>()?;
        Ok(SerializedStack::Routes(routes))
    }

    /// Rebuild `stack` from its serialized form.
    ///
    /// Every element is decoded before the stack is touched, so a failure
    /// leaves the stack as it was.
    pub async fn decode_stack(&self, stack: &Stack<R>, data: &SerializedStack) -> Result<()> {
        match (stack.kind().is_indexed(), data) {
            (true, SerializedStack::Index(index)) => {
                stack
                    .set_active_index(*index)
                    .map_err(|err| match err {
                        StackError::IndexOutOfRange { stack, index, len } => {
                            RestoreError::IndexOutOfRange { stack, index, len }
                        }
                        other => RestoreError::Stack(other),
                    })
            }
            (false, SerializedStack::Routes(elements)) => {
                let routes = self.decode_routes(elements).await?;
                tracing::debug!(stack = %stack.label(), routes = routes.len(), "Restoring stack");
                stack.restore(routes);
                Ok(())
            }
            (true, _) => Err(RestoreError::ShapeMismatch {
                stack: stack.label().to_string(),
                expected: "an active index",
            }),
            (false, _) => Err(RestoreError::ShapeMismatch {
                stack: stack.label().to_string(),
                expected: "a route list",
            }),
        }
    }
}
