// [libs/domain/models/src/change.rs]

use serde::{Deserialize, Serialize};

/**
 * Evento de cambio entregado por el Broker a cada consumidor de un tópico.
 *
 * 'Resync' es el marcador en banda de re-establecimiento del flujo: el
 * consumidor debe releer el mundo y fusionarlo con su vista local; no
 * transporta fila porque ninguna fila individual lo describe.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent<T> {
    Added(T),
    Updated(T),
    Deleted(T),
    Resync,
}

impl<T> ChangeEvent<T> {
    /// Fila transportada, si el evento describe una.
    #[must_use]
    pub fn row(&self) -> Option<&T> {
        match self {
            ChangeEvent::Added(row) | ChangeEvent::Updated(row) | ChangeEvent::Deleted(row) => {
                Some(row)
            }
            ChangeEvent::Resync => None,
        }
    }

    /// Cierto si el evento es el marcador de reconvergencia.
    #[must_use]
    pub fn is_resync(&self) -> bool {
        matches!(self, ChangeEvent::Resync)
    }
}
