//! Coordinator construction
//!
//! Layouts, stack adapters, converters and the parser are registered up
//! front; the resulting coordinator never changes its registries.

use std::sync::Arc;
use url::Url;

use wayfarer_restore::{ConverterRegistry, RouteCodec, RouteConverter};
use wayfarer_stack::{LayoutKey, Route, RouteParser, StackKind, StackObserver};

use crate::config::CoordinatorConfig;
use crate::coordinator::{Coordinator, DeepLinkHandler};
use crate::error::CoordinatorError;
use crate::layout::{LayoutRegistry, LayoutSpec};
use crate::observer::LoggingAdapter;
use crate::Result;

pub struct CoordinatorBuilder<R> {
    config: CoordinatorConfig,
    registry: LayoutRegistry<R>,
    converters: ConverterRegistry<R>,
    parser: Option<Arc<dyn RouteParser<R>>>,
    deep_link: Option<Arc<dyn DeepLinkHandler<R>>>,
}

impl<R: Route> CoordinatorBuilder<R> {
    pub fn new(config: CoordinatorConfig) -> Self {
        let mut registry = LayoutRegistry::new();
        registry.register_adapter(StackKind::List, Arc::new(LoggingAdapter));
        registry.register_adapter(StackKind::Indexed, Arc::new(LoggingAdapter));

        Self {
            config,
            registry,
            converters: ConverterRegistry::new(),
            parser: None,
            deep_link: None,
        }
    }

    pub fn layout(mut self, key: LayoutKey, spec: LayoutSpec<R>) -> Self {
        self.registry.register_layout(key, spec);
        self
    }

    /// Observer attached to every stack of `kind`. Replaces the built-in
    /// adapter for `List` and `Indexed`.
    pub fn stack_adapter(mut self, kind: StackKind, adapter: Arc<dyn StackObserver<R>>) -> Self {
        self.registry.register_adapter(kind, adapter);
        self
    }

    pub fn converter(mut self, key: impl Into<String>, converter: impl RouteConverter<R> + 'static) -> Self {
        self.converters.register(key, converter);
        self
    }

    pub fn parser(mut self, parser: impl RouteParser<R> + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    pub fn deep_link_handler(mut self, handler: impl DeepLinkHandler<R> + 'static) -> Self {
        self.deep_link = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Coordinator<R>> {
        self.config.validate()?;

        let parser = self.parser.ok_or(CoordinatorError::MissingParser)?;
        let base = Url::parse(&self.config.location_base).map_err(|source| {
            CoordinatorError::InvalidBase {
                base: self.config.location_base.clone(),
                source,
            }
        })?;

        for (key, spec) in self.registry.specs() {
            if let Some(label) = spec.stack_label() {
                if !self.config.auxiliary_stacks.iter().any(|l| l == label) {
                    tracing::error!(layout = %key, stack = %label, "Layout bound to an unknown stack");
                    return Err(CoordinatorError::UnknownStack {
                        label: label.to_string(),
                    });
                }
            }
        }

        let codec = RouteCodec::new(Arc::clone(&parser), base.clone())
            .with_converters(self.converters)
            .with_layouts(self.registry.keys());

        Ok(Coordinator::from_parts(
            self.config,
            base,
            self.registry,
            codec,
            parser,
            self.deep_link,
        ))
    }
}
